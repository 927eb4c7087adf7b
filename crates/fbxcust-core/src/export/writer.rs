//! Low-level FBX ASCII emitter
//!
//! Tracks block nesting and formats every number with a fixed precision so
//! identical input always produces identical bytes.

use std::fmt::Display;
use std::io::{self, Write};

/// Decimal places for geometry and transforms
pub const GEOMETRY_DECIMALS: usize = 6;
/// Decimal places for keyframe values
pub const KEY_DECIMALS: usize = 15;

/// Values per line in long arrays
const ARRAY_WRAP: usize = 64;

/// Format a float with fixed precision; `-0` and non-finite values print as zero
pub fn number(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return format!("{:.decimals$}", 0.0);
    }
    let text = format!("{value:.decimals$}");
    match text.strip_prefix('-') {
        Some(rest) if rest.bytes().all(|b| b == b'0' || b == b'.') => rest.to_string(),
        _ => text,
    }
}

/// Format with [`GEOMETRY_DECIMALS`]
pub fn num(value: impl Into<f64>) -> String {
    number(value.into(), GEOMETRY_DECIMALS)
}

/// Comma-joined numbers with geometry precision
pub fn nums<I>(values: I) -> String
where
    I: IntoIterator,
    I::Item: Into<f64>,
{
    values.into_iter().map(num).collect::<Vec<_>>().join(",")
}

/// Quote a string value
pub fn quoted(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "'"))
}

/// Quoted `"Id", "Class"` pair opening an object block
pub fn object_header(id: &str, class: &str) -> String {
    format!("{}, {}", quoted(id), quoted(class))
}

/// Indenting writer for the FBX 6.1 text grammar
pub struct FbxWriter<W: Write> {
    out: W,
    depth: usize,
}

impl<W: Write> FbxWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, depth: 0 }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn indent(&mut self) -> io::Result<()> {
        for _ in 0..self.depth {
            self.out.write_all(b"\t")?;
        }
        Ok(())
    }

    /// `; text`
    pub fn comment(&mut self, text: &str) -> io::Result<()> {
        self.indent()?;
        writeln!(self.out, "; {text}")
    }

    /// Section separator used between top-level blocks
    pub fn section(&mut self, title: &str) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "; {title}")?;
        writeln!(self.out, ";{}", "-".repeat(66))?;
        writeln!(self.out)
    }

    pub fn blank(&mut self) -> io::Result<()> {
        writeln!(self.out)
    }

    /// Open `Name: args {`
    pub fn begin(&mut self, name: &str, args: &str) -> io::Result<()> {
        self.indent()?;
        writeln!(self.out, "{name}: {args} {{")?;
        self.depth += 1;
        Ok(())
    }

    /// Close the innermost block
    pub fn end(&mut self) -> io::Result<()> {
        self.depth = self.depth.saturating_sub(1);
        self.indent()?;
        writeln!(self.out, "}}")
    }

    /// `Name: value`
    pub fn field(&mut self, name: &str, value: impl Display) -> io::Result<()> {
        self.indent()?;
        writeln!(self.out, "{name}: {value}")
    }

    /// `Name: "value"`
    pub fn string(&mut self, name: &str, value: &str) -> io::Result<()> {
        self.field(name, quoted(value))
    }

    /// `Property: "name", "type", "flags",value`
    pub fn property(&mut self, name: &str, kind: &str, value: impl Display) -> io::Result<()> {
        self.indent()?;
        writeln!(self.out, "Property: \"{name}\", \"{kind}\", \"\",{value}")
    }

    /// Animatable property (`A+` flag)
    pub fn animated(&mut self, name: &str, kind: &str, value: impl Display) -> io::Result<()> {
        self.indent()?;
        writeln!(self.out, "Property: \"{name}\", \"{kind}\", \"A+\",{value}")
    }

    /// `Name: v,v,v` wrapped onto continuation lines
    pub fn array<I, T>(&mut self, name: &str, values: I) -> io::Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Display,
    {
        self.indent()?;
        write!(self.out, "{name}: ")?;
        for (i, value) in values.into_iter().enumerate() {
            if i > 0 {
                if i % ARRAY_WRAP == 0 {
                    writeln!(self.out, ",")?;
                    self.indent()?;
                    write!(self.out, "\t")?;
                } else {
                    write!(self.out, ",")?;
                }
            }
            write!(self.out, "{value}")?;
        }
        writeln!(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(f: impl FnOnce(&mut FbxWriter<Vec<u8>>) -> io::Result<()>) -> String {
        let mut writer = FbxWriter::new(Vec::new());
        f(&mut writer).unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(number(1.5, 6), "1.500000");
        assert_eq!(number(-0.0, 6), "0.000000");
        assert_eq!(number(-0.0000001, 6), "0.000000");
        assert_eq!(number(-2.25, 2), "-2.25");
        assert_eq!(number(f64::NAN, 3), "0.000");
        assert_eq!(num(0.1f32), "0.100000");
    }

    #[test]
    fn test_blocks_indent() {
        let text = render(|w| {
            w.begin("Objects", "")?;
            w.begin("Model", "\"Model::Cube\", \"Mesh\"")?;
            w.field("Version", 232)?;
            w.end()?;
            w.end()
        });
        assert_eq!(
            text,
            "Objects:  {\n\tModel: \"Model::Cube\", \"Mesh\" {\n\t\tVersion: 232\n\t}\n}\n"
        );
    }

    #[test]
    fn test_object_header_replaces_quotes() {
        assert_eq!(object_header("Model::Cube \"big\"", "Mesh"), "\"Model::Cube 'big'\", \"Mesh\"");
    }

    #[test]
    fn test_property_line() {
        let text = render(|w| w.animated("Lcl Translation", "Lcl Translation", nums([1.0f32, 0.0, -0.0])));
        assert_eq!(
            text,
            "Property: \"Lcl Translation\", \"Lcl Translation\", \"A+\",1.000000,0.000000,0.000000\n"
        );
    }

    #[test]
    fn test_array_wraps() {
        let text = render(|w| w.array("PolygonVertexIndex", 0..70));
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("PolygonVertexIndex: 0,1,"));
        assert!(lines[0].ends_with("63,"));
        assert_eq!(lines[1], "\t64,65,66,67,68,69");
    }
}
