//! Location path rendering

use crate::context::Context;

/// Separator placed between `Type:id` segments of a location path
pub const PATH_SEPARATOR: &str = " / ";

/// Render a location stack, root first, as `Type:id / Type:id / ...`.
pub fn location_path<'a, I>(stack: I) -> String
where
    I: IntoIterator<Item = &'a Context>,
{
    stack
        .into_iter()
        .map(Context::path_segment)
        .collect::<Vec<_>>()
        .join(PATH_SEPARATOR)
}

/// Extend an already rendered path with one more segment.
pub fn append_segment(path: &str, context: &Context) -> String {
    if path.is_empty() {
        context.path_segment()
    } else {
        format!("{path}{PATH_SEPARATOR}{}", context.path_segment())
    }
}
