//! Serialise a [`Drawing`] as AutoCAD R2000 (`AC1015`) ASCII DXF.
//!
//! Sections are written in the fixed order HEADER, CLASSES, TABLES, BLOCKS,
//! ENTITIES, OBJECTS. Handles are allocated sequentially while the body is
//! written; the header, which records the next free handle, is written last
//! and placed in front of the body.
use std::io::{self, Write};

use geo::{Coord, Rect};

use super::document::{Drawing, DrawingHeader, Entity, Layer};
use super::writer::{GroupWriter, Handle};

/// First handle handed out. Handle `0` is reserved for "no owner".
const FIRST_HANDLE: u64 = 1;
/// The layer every DXF file must declare.
const DEFAULT_LAYER: &str = "0";
const LINETYPE: &str = "CONTINUOUS";
const TEXT_STYLE: &str = "STANDARD";
/// Lineweight code meaning "use the drawing default".
const LINEWEIGHT_DEFAULT: i16 = -3;
/// Entity colour code meaning "use the layer colour".
const COLOR_BYLAYER: i16 = 256;
/// Entity lineweight code meaning "use the layer lineweight".
const LINEWEIGHT_BYLAYER: i16 = -1;
const INSUNITS_METRES: i16 = 6;
const MEASUREMENT_METRIC: i16 = 1;
const LUNITS_DECIMAL: i16 = 2;
/// Viewport padding around the drawing extents.
const VIEW_MARGIN: f64 = 1.1;
const EMPTY_VIEW_HEIGHT: f64 = 100.0;

/// Handles the entity sections refer back to.
struct Owners {
    model_space: Handle,
    paper_space: Handle,
}

/// Write `drawing` to `out`.
///
/// # Examples
/// ```
/// use osm2dxf_core::{Crs, PlanType};
/// use osm2dxf_data::{Drawing, write_drawing};
///
/// let drawing = Drawing::from_placements(PlanType::Location, Crs::default(), &[]);
/// let mut bytes = Vec::new();
/// write_drawing(&drawing, &mut bytes).expect("writing to memory succeeds");
/// let text = String::from_utf8(bytes).expect("ASCII output");
/// assert!(text.starts_with("999\nosm2dxf plan=location scale=1:1000 crs=EPSG:3857\n"));
/// assert!(text.ends_with("  0\nEOF\n"));
/// ```
pub fn write_drawing<W: Write>(drawing: &Drawing, mut out: W) -> io::Result<()> {
    let mut body = GroupWriter::new(Vec::new(), FIRST_HANDLE);
    write_classes(&mut body)?;
    let owners = write_tables(&mut body, drawing)?;
    write_blocks(&mut body, &owners)?;
    write_entities(&mut body, drawing, &owners)?;
    write_objects(&mut body)?;
    body.code(0, "EOF")?;
    let seed = body.handle_seed();
    let body = body.into_inner();

    {
        let mut head = GroupWriter::new(&mut out, FIRST_HANDLE);
        write_header(&mut head, &drawing.header, seed)?;
    }
    out.write_all(&body)?;
    out.flush()
}

fn begin_section<W: Write>(w: &mut GroupWriter<W>, name: &str) -> io::Result<()> {
    w.code(0, "SECTION")?;
    w.code(2, name)
}

fn end_section<W: Write>(w: &mut GroupWriter<W>) -> io::Result<()> {
    w.code(0, "ENDSEC")
}

fn write_header<W: Write>(
    w: &mut GroupWriter<W>,
    header: &DrawingHeader,
    seed: Handle,
) -> io::Result<()> {
    w.code(
        999,
        format_args!(
            "osm2dxf plan={} scale=1:{} crs={}",
            header.plan, header.scale_denominator, header.crs
        ),
    )?;
    begin_section(w, "HEADER")?;
    let variable = |w: &mut GroupWriter<W>, name: &str| w.code(9, name);

    variable(w, "$ACADVER")?;
    w.code(1, "AC1015")?;
    variable(w, "$DWGCODEPAGE")?;
    w.code(3, "ANSI_1252")?;
    variable(w, "$HANDSEED")?;
    w.code(5, seed)?;
    variable(w, "$INSUNITS")?;
    w.code(70, INSUNITS_METRES)?;
    variable(w, "$MEASUREMENT")?;
    w.code(70, MEASUREMENT_METRIC)?;
    variable(w, "$LUNITS")?;
    w.code(70, LUNITS_DECIMAL)?;

    let (min, max) = extents_or_origin(header.extents);
    variable(w, "$EXTMIN")?;
    w.point3(10, min.x, min.y)?;
    variable(w, "$EXTMAX")?;
    w.point3(10, max.x, max.y)?;

    let scale = header.scale_factor();
    variable(w, "$LTSCALE")?;
    w.real(40, scale)?;
    variable(w, "$DIMSCALE")?;
    w.real(40, scale)?;
    variable(w, "$TEXTSIZE")?;
    w.real(40, header.text_height())?;
    variable(w, "$USERR1")?;
    w.real(40, f64::from(header.scale_denominator))?;
    variable(w, "$LWDISPLAY")?;
    w.code(290, 1)?;
    end_section(w)
}

fn extents_or_origin(extents: Option<Rect<f64>>) -> (Coord<f64>, Coord<f64>) {
    extents.map_or((Coord::zero(), Coord::zero()), |rect| (rect.min(), rect.max()))
}

fn write_classes<W: Write>(w: &mut GroupWriter<W>) -> io::Result<()> {
    begin_section(w, "CLASSES")?;
    end_section(w)
}

fn begin_table<W: Write>(w: &mut GroupWriter<W>, name: &str, entries: usize) -> io::Result<Handle> {
    let handle = w.allocate();
    w.code(0, "TABLE")?;
    w.code(2, name)?;
    w.code(5, handle)?;
    w.code(330, Handle::NONE)?;
    w.code(100, "AcDbSymbolTable")?;
    w.code(70, entries)?;
    Ok(handle)
}

fn end_table<W: Write>(w: &mut GroupWriter<W>) -> io::Result<()> {
    w.code(0, "ENDTAB")
}

fn begin_record<W: Write>(
    w: &mut GroupWriter<W>,
    kind: &str,
    owner: Handle,
    subclass: &str,
) -> io::Result<Handle> {
    let handle = w.allocate();
    w.code(0, kind)?;
    w.code(5, handle)?;
    w.code(330, owner)?;
    w.code(100, "AcDbSymbolTableRecord")?;
    w.code(100, subclass)?;
    Ok(handle)
}

fn write_tables<W: Write>(w: &mut GroupWriter<W>, drawing: &Drawing) -> io::Result<Owners> {
    begin_section(w, "TABLES")?;
    write_vport_table(w, drawing.header.extents)?;
    write_ltype_table(w)?;
    write_layer_table(w, &drawing.layers)?;
    write_style_table(w, &drawing.header)?;

    for name in ["VIEW", "UCS"] {
        begin_table(w, name, 0)?;
        end_table(w)?;
    }

    let table = begin_table(w, "APPID", 1)?;
    begin_record(w, "APPID", table, "AcDbRegAppTableRecord")?;
    w.code(2, "ACAD")?;
    w.code(70, 0)?;
    end_table(w)?;

    write_dimstyle_table(w, &drawing.header)?;
    let owners = write_block_record_table(w)?;
    end_section(w)?;
    Ok(owners)
}

fn write_vport_table<W: Write>(w: &mut GroupWriter<W>, extents: Option<Rect<f64>>) -> io::Result<()> {
    let table = begin_table(w, "VPORT", 1)?;
    begin_record(w, "VPORT", table, "AcDbViewportTableRecord")?;
    w.code(2, "*ACTIVE")?;
    w.code(70, 0)?;
    w.point(10, 0.0, 0.0)?;
    w.point(11, 1.0, 1.0)?;
    let (center, height) = extents.map_or((Coord::zero(), EMPTY_VIEW_HEIGHT), |rect| {
        let span = rect.height().max(rect.width());
        let height = if span > 0.0 { span * VIEW_MARGIN } else { EMPTY_VIEW_HEIGHT };
        (rect.center(), height)
    });
    w.point(12, center.x, center.y)?;
    w.real(40, height)?;
    w.real(41, 1.0)?;
    end_table(w)
}

fn write_ltype_table<W: Write>(w: &mut GroupWriter<W>) -> io::Result<()> {
    let linetypes = [("BYBLOCK", ""), ("BYLAYER", ""), (LINETYPE, "Solid line")];
    let table = begin_table(w, "LTYPE", linetypes.len())?;
    for (name, description) in linetypes {
        begin_record(w, "LTYPE", table, "AcDbLinetypeTableRecord")?;
        w.code(2, name)?;
        w.code(70, 0)?;
        w.code(3, description)?;
        w.code(72, 65)?;
        w.code(73, 0)?;
        w.real(40, 0.0)?;
    }
    end_table(w)
}

fn write_layer_table<W: Write>(w: &mut GroupWriter<W>, layers: &[Layer]) -> io::Result<()> {
    let table = begin_table(w, "LAYER", layers.len() + 1)?;
    write_layer(w, table, DEFAULT_LAYER, 7, LINEWEIGHT_DEFAULT)?;
    for layer in layers {
        write_layer(
            w,
            table,
            layer.name,
            i16::from(layer.color.index()),
            layer.lineweight.hundredths_mm(),
        )?;
    }
    end_table(w)
}

fn write_layer<W: Write>(
    w: &mut GroupWriter<W>,
    table: Handle,
    name: &str,
    color: i16,
    lineweight: i16,
) -> io::Result<()> {
    begin_record(w, "LAYER", table, "AcDbLayerTableRecord")?;
    w.text(2, name)?;
    w.code(70, 0)?;
    w.code(62, color)?;
    w.code(6, LINETYPE)?;
    w.code(370, lineweight)
}

fn write_style_table<W: Write>(w: &mut GroupWriter<W>, header: &DrawingHeader) -> io::Result<()> {
    let table = begin_table(w, "STYLE", 1)?;
    begin_record(w, "STYLE", table, "AcDbTextStyleTableRecord")?;
    w.code(2, TEXT_STYLE)?;
    w.code(70, 0)?;
    w.real(40, 0.0)?;
    w.real(41, 1.0)?;
    w.real(50, 0.0)?;
    w.code(71, 0)?;
    w.real(42, header.text_height())?;
    w.code(3, "txt")?;
    w.code(4, "")?;
    end_table(w)
}

fn write_dimstyle_table<W: Write>(w: &mut GroupWriter<W>, header: &DrawingHeader) -> io::Result<()> {
    let table = begin_table(w, "DIMSTYLE", 1)?;
    w.code(100, "AcDbDimStyleTable")?;
    let handle = w.allocate();
    w.code(0, "DIMSTYLE")?;
    w.code(105, handle)?;
    w.code(330, table)?;
    w.code(100, "AcDbSymbolTableRecord")?;
    w.code(100, "AcDbDimStyleTableRecord")?;
    w.code(2, TEXT_STYLE)?;
    w.code(70, 0)?;
    w.real(40, header.scale_factor())?;
    end_table(w)
}

fn write_block_record_table<W: Write>(w: &mut GroupWriter<W>) -> io::Result<Owners> {
    let table = begin_table(w, "BLOCK_RECORD", 2)?;
    let model_space = begin_record(w, "BLOCK_RECORD", table, "AcDbBlockTableRecord")?;
    w.code(2, "*Model_Space")?;
    let paper_space = begin_record(w, "BLOCK_RECORD", table, "AcDbBlockTableRecord")?;
    w.code(2, "*Paper_Space")?;
    end_table(w)?;
    Ok(Owners {
        model_space,
        paper_space,
    })
}

fn write_blocks<W: Write>(w: &mut GroupWriter<W>, owners: &Owners) -> io::Result<()> {
    begin_section(w, "BLOCKS")?;
    for (name, owner, paper) in [
        ("*Model_Space", owners.model_space, false),
        ("*Paper_Space", owners.paper_space, true),
    ] {
        let begin = w.allocate();
        w.code(0, "BLOCK")?;
        w.code(5, begin)?;
        w.code(330, owner)?;
        w.code(100, "AcDbEntity")?;
        if paper {
            w.code(67, 1)?;
        }
        w.code(8, DEFAULT_LAYER)?;
        w.code(100, "AcDbBlockBegin")?;
        w.code(2, name)?;
        w.code(70, 0)?;
        w.point3(10, 0.0, 0.0)?;
        w.code(3, name)?;
        w.code(1, "")?;

        let end = w.allocate();
        w.code(0, "ENDBLK")?;
        w.code(5, end)?;
        w.code(330, owner)?;
        w.code(100, "AcDbEntity")?;
        if paper {
            w.code(67, 1)?;
        }
        w.code(8, DEFAULT_LAYER)?;
        w.code(100, "AcDbBlockEnd")?;
    }
    end_section(w)
}

fn begin_entity<W: Write>(
    w: &mut GroupWriter<W>,
    kind: &str,
    layer: &str,
    owners: &Owners,
) -> io::Result<()> {
    let handle = w.allocate();
    w.code(0, kind)?;
    w.code(5, handle)?;
    w.code(330, owners.model_space)?;
    w.code(100, "AcDbEntity")?;
    w.text(8, layer)?;
    w.code(62, COLOR_BYLAYER)?;
    w.code(370, LINEWEIGHT_BYLAYER)
}

fn write_entities<W: Write>(
    w: &mut GroupWriter<W>,
    drawing: &Drawing,
    owners: &Owners,
) -> io::Result<()> {
    begin_section(w, "ENTITIES")?;
    for entity in &drawing.entities {
        match entity {
            Entity::Polyline {
                layer,
                closed,
                vertices,
            } => {
                begin_entity(w, "LWPOLYLINE", layer, owners)?;
                w.code(100, "AcDbPolyline")?;
                w.code(90, vertices.len())?;
                w.code(70, i16::from(*closed))?;
                w.real(43, 0.0)?;
                for vertex in vertices {
                    w.point(10, vertex.x, vertex.y)?;
                }
            }
            Entity::Point { layer, at } => {
                begin_entity(w, "POINT", layer, owners)?;
                w.code(100, "AcDbPoint")?;
                w.point3(10, at.x, at.y)?;
            }
            Entity::Text {
                layer,
                text,
                anchor,
                height,
            } => {
                begin_entity(w, "TEXT", layer, owners)?;
                w.code(100, "AcDbText")?;
                w.point3(10, anchor.x, anchor.y)?;
                w.real(40, *height)?;
                w.text(1, text)?;
                w.code(7, TEXT_STYLE)?;
                // Middle-centre: horizontal centre (72 = 1), vertical middle (73 = 2).
                w.code(72, 1)?;
                w.point3(11, anchor.x, anchor.y)?;
                w.code(100, "AcDbText")?;
                w.code(73, 2)?;
            }
        }
    }
    end_section(w)
}

fn write_objects<W: Write>(w: &mut GroupWriter<W>) -> io::Result<()> {
    begin_section(w, "OBJECTS")?;
    let root = w.allocate();
    let groups = w.allocate();
    w.code(0, "DICTIONARY")?;
    w.code(5, root)?;
    w.code(330, Handle::NONE)?;
    w.code(100, "AcDbDictionary")?;
    w.code(281, 1)?;
    w.code(3, "ACAD_GROUP")?;
    w.code(350, groups)?;

    w.code(0, "DICTIONARY")?;
    w.code(5, groups)?;
    w.code(330, root)?;
    w.code(100, "AcDbDictionary")?;
    w.code(281, 1)?;
    end_section(w)
}
