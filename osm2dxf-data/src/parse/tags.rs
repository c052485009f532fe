//! Tag collection shared by the parser backends.
use osm2dxf_core::Tags;

/// Collect borrowed key/value pairs into owned [`Tags`].
///
/// Later duplicates of a key overwrite earlier ones, matching how editors
/// resolve repeated `tag` elements.
pub(super) fn collect_tags<'a, T>(tags: T) -> Tags
where
    T: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut collected = Tags::new();
    for (key, value) in tags {
        collected.insert(key.to_owned(), value.to_owned());
    }
    collected
}
