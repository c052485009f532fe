use base64::{Engine as _, engine::general_purpose};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Directory containing the encoded fixture blobs.
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Decode a Base64-encoded `.osm.pbf` fixture.
pub fn decode_fixture(dir: &Path, stem: &str) -> Vec<u8> {
    let encoded_path = dir.join(format!("{stem}.osm.pbf.b64"));
    let encoded = fs::read_to_string(&encoded_path).unwrap_or_else(|err| {
        panic!("failed to read base64 fixture {encoded_path:?}: {err}");
    });
    let cleaned: String = encoded
        .chars()
        .filter(|ch| !ch.is_ascii_whitespace())
        .collect();
    general_purpose::STANDARD
        .decode(cleaned.as_bytes())
        .unwrap_or_else(|err| {
            panic!("failed to decode base64 fixture {encoded_path:?}: {err}");
        })
}

/// A DXF group code and its value.
pub type Pair = (i32, String);

/// Split DXF bytes into group-code pairs.
pub fn group_pairs(bytes: &[u8]) -> Vec<Pair> {
    let text = std::str::from_utf8(bytes).unwrap_or_else(|err| {
        panic!("drawing is not ASCII: {err}");
    });
    let lines: Vec<&str> = text.lines().collect();
    lines
        .chunks(2)
        .map(|chunk| match chunk {
            [code, value] => {
                let code = code
                    .trim()
                    .parse()
                    .unwrap_or_else(|err| panic!("bad group code {code:?}: {err}"));
                (code, (*value).to_owned())
            }
            other => panic!("dangling group code {other:?}"),
        })
        .collect()
}

/// Pairs of one section, without its `SECTION`/`ENDSEC` markers.
pub fn section<'a>(pairs: &'a [Pair], name: &str) -> &'a [Pair] {
    let start = pairs
        .windows(2)
        .position(|window| {
            matches!(window, [(0, marker), (2, section)] if marker == "SECTION" && section == name)
        })
        .unwrap_or_else(|| panic!("section {name} missing"));
    let body = pairs.get(start + 2..).unwrap_or_default();
    let end = body
        .iter()
        .position(|(code, value)| *code == 0 && value == "ENDSEC")
        .unwrap_or_else(|| panic!("section {name} not terminated"));
    body.get(..end).unwrap_or_default()
}

/// Records of a section, each starting at a group code `0`.
pub fn records(section: &[Pair]) -> Vec<&[Pair]> {
    let mut starts: Vec<usize> = section
        .iter()
        .enumerate()
        .filter(|(_, (code, _))| *code == 0)
        .map(|(index, _)| index)
        .collect();
    starts.push(section.len());
    starts
        .windows(2)
        .filter_map(|bounds| match bounds {
            [from, to] => section.get(*from..*to),
            _ => None,
        })
        .collect()
}

/// First value of `code` within a record.
pub fn field<'a>(record: &'a [Pair], code: i32) -> Option<&'a str> {
    record
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, value)| value.as_str())
}
