//! OSM XML backend built on `quick-xml`.
//!
//! The reader walks the event stream once. `node`, `way` and `relation`
//! elements are buffered as drafts until their end tag so that child `tag`,
//! `nd` and `member` elements can be attached; a draft with a defect is
//! reported and skipped rather than failing the whole document.
use std::collections::HashMap;
use std::io::{self, BufRead, Read};
use std::str::FromStr;

use geo::{Coord, Rect};
use log::debug;
use osm2dxf_core::{ElementKind, Member, OsmId, Tags};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::graph::OsmGraphBuilder;
use super::tags::collect_tags;
use super::{GeodataSource, ParseError, ParsedGeodata};

const ROOT: &str = "osm";

/// Reads OSM XML from a buffered stream.
///
/// # Examples
/// ```
/// use osm2dxf_data::{GeodataSource, XmlSource};
///
/// let xml = r#"<osm version="0.6">
///   <node id="1" lat="0.0" lon="0.0"/>
///   <node id="2" lat="0.0" lon="0.001"/>
///   <way id="10"><nd ref="1"/><nd ref="2"/><tag k="highway" v="path"/></way>
/// </osm>"#;
/// let parsed = XmlSource::new(xml.as_bytes()).read_geodata().expect("valid XML");
/// assert_eq!(parsed.data.ways.len(), 1);
/// assert!(parsed.warnings.is_empty());
/// ```
pub struct XmlSource<R> {
    reader: Reader<LineCounter<R>>,
}

impl<R: BufRead> XmlSource<R> {
    /// Wrap a buffered byte stream.
    pub fn new(input: R) -> Self {
        let mut reader = Reader::from_reader(LineCounter::new(input));
        reader.trim_text(true);
        Self { reader }
    }

    fn position(&self) -> (usize, usize) {
        let position = self.reader.buffer_position();
        (position, self.reader.get_ref().line_at(position))
    }

    fn fail(&self, source: quick_xml::Error) -> ParseError {
        if let quick_xml::Error::Io(source) = source {
            return ParseError::Io { source };
        }
        let (position, line) = self.position();
        ParseError::Xml {
            position,
            line,
            source,
        }
    }
}

impl<R: BufRead> GeodataSource for XmlSource<R> {
    fn read_geodata(mut self) -> Result<ParsedGeodata, ParseError> {
        let mut document = Document::default();
        let mut buf = Vec::new();
        loop {
            let event = match self.reader.read_event_into(&mut buf) {
                Ok(event) => event,
                Err(err) => return Err(self.fail(err)),
            };
            match event {
                Event::Start(start) => {
                    let name = element_name(&start);
                    document.check_root(&name)?;
                    document
                        .open(&name, &start)
                        .map_err(|err| self.fail(err))?;
                    let (position, _) = self.position();
                    document.stack.push((name, position));
                }
                Event::Empty(start) => {
                    let name = element_name(&start);
                    document.check_root(&name)?;
                    document
                        .open(&name, &start)
                        .map_err(|err| self.fail(err))?;
                    document.close(&name);
                }
                Event::End(end) => {
                    let name = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                    document.stack.pop();
                    document.close(&name);
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if let Some((element, position)) = document.stack.pop() {
            return Err(ParseError::UnclosedElement {
                element,
                position,
                line: self.reader.get_ref().line_at(position),
            });
        }
        if !document.root_seen {
            return Err(ParseError::MissingRoot { found: None });
        }
        Ok(document.builder.finish())
    }
}

#[derive(Debug, Default)]
struct Document {
    builder: OsmGraphBuilder,
    stack: Vec<(String, usize)>,
    root_seen: bool,
    current: Option<Draft>,
}

impl Document {
    fn check_root(&mut self, name: &str) -> Result<(), ParseError> {
        if self.root_seen {
            return Ok(());
        }
        if name != ROOT {
            return Err(ParseError::MissingRoot {
                found: Some(name.to_owned()),
            });
        }
        self.root_seen = true;
        Ok(())
    }

    fn open(&mut self, name: &str, start: &BytesStart<'_>) -> Result<(), quick_xml::Error> {
        let Some(draft) = self.current.as_mut() else {
            match name {
                "node" | "way" | "relation" => {
                    let attrs = attribute_map(start)?;
                    self.current =
                        ElementKind::from_osm(name).map(|kind| Draft::new(kind, &attrs));
                }
                "bounds" => match declared_bounds(&attribute_map(start)?) {
                    Ok(bounds) => self.builder.declare_bounds(bounds),
                    Err(reason) => debug!("ignoring bounds element: {reason}"),
                },
                _ => {}
            }
            return Ok(());
        };
        match name {
            "tag" => {
                let attrs = attribute_map(start)?;
                match (attrs.get("k"), attrs.get("v")) {
                    (Some(key), Some(value)) => draft.tags.push((key.clone(), value.clone())),
                    _ => draft.reject("tag without k or v attribute"),
                }
            }
            "nd" if draft.kind == ElementKind::Way => {
                match required::<OsmId>(&attribute_map(start)?, "ref") {
                    Ok(node) => draft.refs.push(node),
                    Err(reason) => draft.reject(format!("nd {reason}")),
                }
            }
            "member" if draft.kind == ElementKind::Relation => {
                match member(&attribute_map(start)?) {
                    Ok(member) => draft.members.push(member),
                    Err(reason) => draft.reject(format!("member {reason}")),
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &str) {
        let closes_current = self
            .current
            .as_ref()
            .is_some_and(|draft| draft.kind.as_str() == name);
        if !closes_current {
            return;
        }
        if let Some(draft) = self.current.take() {
            draft.commit(&mut self.builder);
        }
    }
}

/// An element whose children are still being read.
#[derive(Debug)]
struct Draft {
    kind: ElementKind,
    id: Option<OsmId>,
    location: Option<Coord<f64>>,
    hidden: bool,
    defect: Option<String>,
    tags: Vec<(String, String)>,
    refs: Vec<OsmId>,
    members: Vec<Member>,
}

impl Draft {
    fn new(kind: ElementKind, attrs: &Attributes) -> Self {
        let mut draft = Self {
            kind,
            id: None,
            location: None,
            hidden: attrs.get("visible").is_some_and(|visible| visible == "false"),
            defect: None,
            tags: Vec::new(),
            refs: Vec::new(),
            members: Vec::new(),
        };
        match required::<OsmId>(attrs, "id") {
            Ok(id) => draft.id = Some(id),
            Err(reason) => draft.reject(reason),
        }
        if kind == ElementKind::Node {
            match (required::<f64>(attrs, "lon"), required::<f64>(attrs, "lat")) {
                (Ok(x), Ok(y)) => draft.location = Some(Coord { x, y }),
                (Err(reason), _) | (_, Err(reason)) => draft.reject(reason),
            }
        }
        draft
    }

    /// Record the first defect; later ones add nothing.
    fn reject(&mut self, reason: impl Into<String>) {
        if self.defect.is_none() {
            self.defect = Some(reason.into());
        }
    }

    fn commit(self, builder: &mut OsmGraphBuilder) {
        if self.hidden {
            debug!("skipping deleted {} {:?}", self.kind, self.id);
            return;
        }
        let tags: Tags = collect_tags(self.tags.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        match (self.defect, self.id, self.location) {
            (Some(reason), id, _) => builder.skip_malformed(self.kind, id, reason),
            (None, Some(id), Some(location)) if self.kind == ElementKind::Node => {
                builder.add_node(id, location.x, location.y, tags);
            }
            (None, Some(id), _) if self.kind == ElementKind::Way => {
                builder.add_way(id, self.refs, tags);
            }
            (None, Some(id), _) if self.kind == ElementKind::Relation => {
                builder.add_relation(id, self.members, tags);
            }
            (None, id, _) => builder.skip_malformed(self.kind, id, "incomplete element"),
        }
    }
}

type Attributes = HashMap<String, String>;

fn element_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

fn attribute_map(start: &BytesStart<'_>) -> Result<Attributes, quick_xml::Error> {
    let mut attrs = Attributes::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attrs.insert(key, value);
    }
    Ok(attrs)
}

fn required<T: FromStr>(attrs: &Attributes, name: &str) -> Result<T, String> {
    let raw = attrs
        .get(name)
        .ok_or_else(|| format!("missing {name} attribute"))?;
    raw.trim()
        .parse()
        .map_err(|_| format!("invalid {name} attribute {raw:?}"))
}

fn member(attrs: &Attributes) -> Result<Member, String> {
    let raw_kind = attrs
        .get("type")
        .ok_or_else(|| "missing type attribute".to_owned())?;
    let kind = ElementKind::from_osm(raw_kind)
        .ok_or_else(|| format!("invalid type attribute {raw_kind:?}"))?;
    Ok(Member {
        kind,
        id: required(attrs, "ref")?,
        role: attrs.get("role").cloned().unwrap_or_default(),
    })
}

fn declared_bounds(attrs: &Attributes) -> Result<Rect<f64>, String> {
    let min = Coord {
        x: required(attrs, "minlon")?,
        y: required(attrs, "minlat")?,
    };
    let max = Coord {
        x: required(attrs, "maxlon")?,
        y: required(attrs, "maxlat")?,
    };
    Ok(Rect::new(min, max))
}

/// Buffered reader that remembers where each consumed line ends, so byte
/// offsets reported by the XML reader can be turned into line numbers.
struct LineCounter<R> {
    inner: R,
    consumed: usize,
    newlines: Vec<usize>,
}

impl<R> LineCounter<R> {
    const fn new(inner: R) -> Self {
        Self {
            inner,
            consumed: 0,
            newlines: Vec::new(),
        }
    }

    /// One-based line containing byte `position`.
    fn line_at(&self, position: usize) -> usize {
        1 + self.newlines.partition_point(|offset| *offset < position)
    }
}

impl<R: BufRead> Read for LineCounter<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let count = available.len().min(buf.len());
        if let (Some(target), Some(source)) = (buf.get_mut(..count), available.get(..count)) {
            target.copy_from_slice(source);
        }
        self.consume(count);
        Ok(count)
    }
}

impl<R: BufRead> BufRead for LineCounter<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        let start = self.consumed;
        if let Ok(buffered) = self.inner.fill_buf() {
            self.newlines.extend(
                buffered
                    .iter()
                    .take(amt)
                    .enumerate()
                    .filter(|(_, byte)| **byte == b'\n')
                    .map(|(offset, _)| start + offset),
            );
        }
        self.consumed += amt;
        self.inner.consume(amt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osm2dxf_core::ConversionWarning;
    use rstest::rstest;

    fn parse(xml: &str) -> Result<ParsedGeodata, ParseError> {
        XmlSource::new(xml.as_bytes()).read_geodata()
    }

    fn parse_ok(xml: &str) -> ParsedGeodata {
        parse(xml).unwrap_or_else(|err| panic!("expected valid XML: {err}"))
    }

    #[rstest]
    fn reads_nodes_ways_and_relations_in_source_order() {
        let parsed = parse_ok(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6" generator="test">
  <bounds minlat="0.0" minlon="0.0" maxlat="1.0" maxlon="1.0"/>
  <node id="2" lat="0.5" lon="0.5">
    <tag k="amenity" v="cafe"/>
    <tag k="name" v="Caf&#xe9; &amp; Bar"/>
  </node>
  <node id="1" lat="0.0" lon="0.0"/>
  <way id="10">
    <nd ref="1"/>
    <nd ref="2"/>
    <tag k="highway" v="primary"/>
  </way>
  <relation id="20">
    <member type="way" ref="10" role="outer"/>
    <member type="node" ref="1" role=""/>
    <tag k="type" v="multipolygon"/>
  </relation>
</osm>"#,
        );

        let ids: Vec<OsmId> = parsed.data.nodes.iter().map(|node| node.id).collect();
        assert_eq!(ids, vec![2, 1]);
        let cafe = parsed.data.nodes.get(2).expect("cafe parsed");
        assert_eq!(cafe.tags.get("name").map(String::as_str), Some("Café & Bar"));
        assert_eq!(parsed.data.ways.first().map(|way| way.node_refs.clone()), Some(vec![1, 2]));

        let relation = parsed.data.relations.first().expect("relation parsed");
        assert!(relation.is_multipolygon());
        assert_eq!(relation.members.len(), 2);
        assert_eq!(relation.members.first().map(|m| m.role.as_str()), Some("outer"));
        assert_eq!(
            parsed.bounds.map(|b| b.max()),
            Some(Coord { x: 1.0, y: 1.0 })
        );
        assert!(parsed.warnings.is_empty());
    }

    #[rstest]
    fn empty_root_is_valid() {
        let parsed = parse_ok(r#"<osm version="0.6"/>"#);
        assert!(parsed.data.nodes.is_empty());
        assert!(parsed.bounds.is_none());
    }

    #[rstest]
    fn deleted_elements_are_skipped() {
        let parsed = parse_ok(
            r#"<osm>
  <node id="1" lat="0" lon="0" visible="false"/>
  <node id="2" lat="0" lon="0" visible="true"/>
</osm>"#,
        );
        assert!(!parsed.data.nodes.contains(1));
        assert!(parsed.data.nodes.contains(2));
        assert!(parsed.warnings.is_empty());
    }

    #[rstest]
    #[case(r#"<node lat="0" lon="0"/>"#, ElementKind::Node, None, "missing id attribute")]
    #[case(r#"<node id="x" lat="0" lon="0"/>"#, ElementKind::Node, None, "invalid id")]
    #[case(r#"<node id="3" lon="0"/>"#, ElementKind::Node, Some(3), "missing lat")]
    #[case(r#"<node id="3" lat="north" lon="0"/>"#, ElementKind::Node, Some(3), "invalid lat")]
    #[case(r#"<way id="4"><nd ref="?"/></way>"#, ElementKind::Way, Some(4), "nd invalid ref")]
    #[case(
        r#"<relation id="5"><member type="area" ref="1"/></relation>"#,
        ElementKind::Relation,
        Some(5),
        "member invalid type"
    )]
    fn malformed_elements_become_warnings(
        #[case] element_xml: &str,
        #[case] element: ElementKind,
        #[case] id: Option<OsmId>,
        #[case] reason_prefix: &str,
    ) {
        let parsed = parse_ok(&format!("<osm>{element_xml}<node id=\"99\" lat=\"1\" lon=\"1\"/></osm>"));
        assert!(parsed.data.nodes.contains(99), "parsing continues after the defect");
        match parsed.warnings.as_slice() {
            [ConversionWarning::MalformedElement { element: kind, id: got, reason }] => {
                assert_eq!(*kind, element);
                assert_eq!(*got, id);
                assert!(reason.starts_with(reason_prefix), "reason was {reason:?}");
            }
            other => panic!("expected one malformed-element warning, got {other:?}"),
        }
    }

    #[rstest]
    fn duplicate_and_dangling_references_are_reported() {
        let parsed = parse_ok(
            r#"<osm>
  <node id="1" lat="0" lon="0"/>
  <node id="1" lat="1" lon="1"/>
  <way id="7"><nd ref="1"/><nd ref="2"/></way>
  <way id="8"><nd ref="1"/></way>
</osm>"#,
        );
        assert_eq!(
            parsed.warnings,
            vec![
                ConversionWarning::DuplicateNode { node: 1 },
                ConversionWarning::UnresolvedNode { way: 7, node: 2 },
                ConversionWarning::TooFewNodes { way: 8, count: 1 },
            ]
        );
        assert!(parsed.data.ways.is_empty());
    }

    #[rstest]
    fn unknown_elements_and_stray_children_are_ignored() {
        let parsed = parse_ok(
            r#"<osm>
  <note>exported</note>
  <meta osm_base="2024-01-01T00:00:00Z"/>
  <changeset id="1"><tag k="comment" v="x"/></changeset>
  <node id="1" lat="0" lon="0"><nd ref="3"/></node>
</osm>"#,
        );
        assert_eq!(parsed.data.nodes.len(), 1);
        assert!(parsed.warnings.is_empty());
    }

    #[rstest]
    fn unclosed_element_reports_its_line() {
        let err = parse("<osm>\n  <way id=\"1\">\n    <nd ref=\"1\"/>\n").expect_err("unclosed");
        match err {
            ParseError::UnclosedElement { element, line, .. } => {
                assert_eq!(element, "way");
                assert_eq!(line, 2);
            }
            other => panic!("expected unclosed element, got {other:?}"),
        }
    }

    #[rstest]
    fn mismatched_end_tag_is_fatal() {
        let err = parse("<osm>\n<node id=\"1\" lat=\"0\" lon=\"0\">\n</way>\n</osm>")
            .expect_err("mismatched");
        match err {
            ParseError::Xml { line, position, .. } => {
                assert_eq!(line, 3);
                assert!(position > 0);
            }
            other => panic!("expected XML error, got {other:?}"),
        }
    }

    #[rstest]
    #[case("", None)]
    #[case("   \n", None)]
    #[case("<?xml version=\"1.0\"?>", None)]
    #[case("<gpx><trk/></gpx>", Some("gpx"))]
    fn missing_root_is_fatal(#[case] xml: &str, #[case] expected: Option<&str>) {
        match parse(xml).expect_err("no osm root") {
            ParseError::MissingRoot { found } => assert_eq!(found.as_deref(), expected),
            other => panic!("expected missing root, got {other:?}"),
        }
    }

    #[rstest]
    fn counts_lines_across_buffer_refills() {
        let mut counter = LineCounter::new(io::BufReader::with_capacity(4, "ab\ncd\nef".as_bytes()));
        let mut text = String::new();
        counter.read_to_string(&mut text).expect("read");
        assert_eq!(text, "ab\ncd\nef");
        assert_eq!(counter.line_at(0), 1);
        assert_eq!(counter.line_at(3), 2);
        assert_eq!(counter.line_at(7), 3);
    }
}
