use super::query_parser::DataSourceRequest;

/// Offset and limit for a grid page.
///
/// Pages are 1-based; page `0` reads as page `1`. A page size of `0` means the
/// grid asked for every row, so no window applies.
#[must_use]
pub fn parse_pagination(request: &DataSourceRequest) -> Option<(u64, u64)> {
    if request.page_size == 0 {
        return None;
    }
    let offset = request.page.saturating_sub(1).saturating_mul(request.page_size);
    Some((offset, request.page_size))
}
