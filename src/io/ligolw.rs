//! LIGO_LW XML documents: tables of typed columns with comma-delimited streams.
//!
//! Only what the time-slide tool needs is modelled: a generic table reader and
//! writer, plus helpers for the `process`, `process_params` and `time_slide`
//! tables. Unknown tables are carried through unchanged when a document is
//! read, extended, and written back.
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::{debug, info};

use crate::core::timeslides::OffsetVector;
use crate::error::{Error, Result};

const DOCTYPE: &str =
    r#"LIGO_LW SYSTEM "http://ldas-sw.ligo.caltech.edu/doc/ligolwAPI/html/ligolw_dtd.txt""#;

/// Seconds between the Unix and GPS epochs, less accumulated leap seconds
const GPS_EPOCH_OFFSET: i64 = 315_964_800 - 18;

/// Current time in GPS seconds
pub fn gps_now() -> i64 {
    chrono::Utc::now().timestamp() - GPS_EPOCH_OFFSET
}

/// A single column declaration
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: String,
}

impl Column {
    fn new(table: &str, name: &str, kind: &str) -> Self {
        Self {
            name: format!("{}:{}", table, name),
            kind: kind.to_string(),
        }
    }

    /// Column name without the `table:` prefix
    pub fn short_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    fn is_quoted(&self) -> bool {
        matches!(self.kind.as_str(), "lstring" | "ilwd:char" | "char_s" | "char_v")
    }
}

/// A table with raw text cells
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(name: &str, columns: &[(&str, &str)]) -> Self {
        Self {
            name: format!("{}:table", name),
            columns: columns
                .iter()
                .map(|(c, k)| Column::new(name, c, k))
                .collect(),
            rows: Vec::new(),
        }
    }

    /// Table name without the `:table` suffix
    pub fn short_name(&self) -> &str {
        self.name.split(':').next().unwrap_or(&self.name)
    }

    pub fn column_index(&self, short: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.short_name() == short)
    }

    fn require_column(&self, short: &str) -> Result<usize> {
        self.column_index(short).ok_or_else(|| {
            Error::Document(format!("table {} has no column {}", self.name, short))
        })
    }

    /// Append a row given as `(column, value)` pairs; missing columns stay empty
    pub fn push_row(&mut self, values: &[(&str, String)]) {
        let mut row = vec![String::new(); self.columns.len()];
        for (short, value) in values {
            if let Some(i) = self.column_index(short) {
                row[i] = value.clone();
            }
        }
        self.rows.push(row);
    }
}

/// A parsed LIGO_LW document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub tables: Vec<Table>,
}

fn process_table() -> Table {
    Table::new(
        "process",
        &[
            ("program", "lstring"),
            ("version", "lstring"),
            ("comment", "lstring"),
            ("node", "lstring"),
            ("username", "lstring"),
            ("start_time", "int_4s"),
            ("end_time", "int_4s"),
            ("process_id", "ilwd:char"),
        ],
    )
}

fn process_params_table() -> Table {
    Table::new(
        "process_params",
        &[
            ("program", "lstring"),
            ("process_id", "ilwd:char"),
            ("param", "lstring"),
            ("type", "lstring"),
            ("value", "lstring"),
        ],
    )
}

fn time_slide_table() -> Table {
    Table::new(
        "time_slide",
        &[
            ("process_id", "ilwd:char"),
            ("time_slide_id", "ilwd:char"),
            ("instrument", "lstring"),
            ("offset", "real_8"),
        ],
    )
}

fn ilwd(table: &str, column: &str, n: usize) -> String {
    format!("{}:{}:{}", table, column, n)
}

fn ilwd_index(id: &str) -> Option<usize> {
    id.rsplit(':').next()?.parse().ok()
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, short: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.short_name() == short)
    }

    fn table_mut_or_insert(&mut self, short: &str, make: fn() -> Table) -> &mut Table {
        let index = match self.tables.iter().position(|t| t.short_name() == short) {
            Some(i) => i,
            None => {
                self.tables.push(make());
                self.tables.len() - 1
            }
        };
        &mut self.tables[index]
    }

    fn next_id(&self, table: &str, column: &str) -> usize {
        self.table(table)
            .and_then(|t| {
                let col = t.column_index(column)?;
                t.rows.iter().filter_map(|r| ilwd_index(&r[col])).max()
            })
            .map_or(0, |max| max + 1)
    }

    /// Add a process row and its parameters; returns the new process id
    pub fn register_process(
        &mut self,
        program: &str,
        comment: &str,
        params: &[(String, String)],
    ) -> String {
        let id = ilwd("process", "process_id", self.next_id("process", "process_id"));
        let now = gps_now().to_string();
        let username = std::env::var("USER").unwrap_or_default();
        let node = std::env::var("HOSTNAME").unwrap_or_default();
        self.table_mut_or_insert("process", process_table).push_row(&[
            ("program", program.to_string()),
            ("version", env!("CARGO_PKG_VERSION").to_string()),
            ("comment", comment.to_string()),
            ("node", node),
            ("username", username),
            ("start_time", now.clone()),
            ("end_time", now),
            ("process_id", id.clone()),
        ]);
        let table = self.table_mut_or_insert("process_params", process_params_table);
        for (param, value) in params {
            table.push_row(&[
                ("program", program.to_string()),
                ("process_id", id.clone()),
                ("param", param.clone()),
                ("type", "lstring".to_string()),
                ("value", value.clone()),
            ]);
        }
        id
    }

    /// Stamp the end time of a process row
    pub fn finish_process(&mut self, process_id: &str) {
        let now = gps_now().to_string();
        let table = self.table_mut_or_insert("process", process_table);
        let (Some(id_col), Some(end_col)) =
            (table.column_index("process_id"), table.column_index("end_time"))
        else {
            return;
        };
        for row in table.rows.iter_mut().filter(|r| r[id_col] == process_id) {
            row[end_col] = now.clone();
        }
    }

    /// All time slides, keyed by time_slide_id
    pub fn time_slides(&self) -> Result<BTreeMap<String, OffsetVector>> {
        let mut slides: BTreeMap<String, OffsetVector> = BTreeMap::new();
        let Some(table) = self.table("time_slide") else {
            return Ok(slides);
        };
        let id_col = table.require_column("time_slide_id")?;
        let ins_col = table.require_column("instrument")?;
        let off_col = table.require_column("offset")?;
        for row in &table.rows {
            let offset: f64 = row[off_col].parse().map_err(|_| {
                Error::Document(format!("bad time_slide offset `{}`", row[off_col]))
            })?;
            slides
                .entry(row[id_col].clone())
                .or_default()
                .insert(row[ins_col].clone(), offset);
        }
        Ok(slides)
    }

    /// Append offset vectors under fresh time_slide ids; returns the ids
    pub fn append_time_slides(
        &mut self,
        process_id: &str,
        vectors: &[OffsetVector],
    ) -> Vec<String> {
        let first = self.next_id("time_slide", "time_slide_id");
        let table = self.table_mut_or_insert("time_slide", time_slide_table);
        let mut ids = Vec::with_capacity(vectors.len());
        for (n, vector) in vectors.iter().enumerate() {
            let id = ilwd("time_slide", "time_slide_id", first + n);
            for (instrument, offset) in vector.iter() {
                table.push_row(&[
                    ("process_id", process_id.to_string()),
                    ("time_slide_id", id.clone()),
                    ("instrument", instrument.to_string()),
                    ("offset", format_real(offset)),
                ]);
            }
            ids.push(id);
        }
        ids
    }

    /// Parse a document from XML text
    pub fn from_xml(text: &str) -> Result<Self> {
        let mut reader = Reader::from_reader(text.as_bytes());
        reader.trim_text(true);
        let mut buf = Vec::new();
        let mut doc = Document::new();
        let mut current: Option<Table> = None;
        let mut stream: Option<String> = None;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    match tag.as_str() {
                        "Table" => {
                            current = Some(Table {
                                name: attribute(e, b"Name")?.unwrap_or_default(),
                                columns: Vec::new(),
                                rows: Vec::new(),
                            });
                        }
                        "Column" => {
                            if let Some(table) = current.as_mut() {
                                table.columns.push(Column {
                                    name: attribute(e, b"Name")?.unwrap_or_default(),
                                    kind: attribute(e, b"Type")?.unwrap_or_default(),
                                });
                            }
                        }
                        "Stream" => {
                            let delimiter = attribute(e, b"Delimiter")?.unwrap_or_default();
                            if !delimiter.is_empty() && delimiter != "," {
                                return Err(Error::Document(format!(
                                    "unsupported stream delimiter `{}`",
                                    delimiter
                                )));
                            }
                            stream = Some(String::new());
                        }
                        _ => {}
                    }
                }
                Event::Text(e) => {
                    if let Some(s) = stream.as_mut() {
                        s.push_str(&e.unescape()?);
                    }
                }
                Event::End(ref e) => match e.name().as_ref() {
                    b"Stream" => {
                        if let (Some(table), Some(text)) = (current.as_mut(), stream.take()) {
                            table.rows = parse_stream(&text, table.columns.len())?;
                        }
                    }
                    b"Table" => {
                        if let Some(table) = current.take() {
                            debug!("Read table {} with {} rows", table.name, table.rows.len());
                            doc.tables.push(table);
                        }
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        Ok(doc)
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_xml(&text)
    }

    /// Serialize the document as XML
    pub fn to_writer<W: Write>(&self, out: W) -> Result<W> {
        let mut writer = Writer::new_with_indent(out, b'\t', 1);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        writer.write_event(Event::DocType(BytesText::from_escaped(DOCTYPE)))?;
        writer.write_event(Event::Start(BytesStart::new("LIGO_LW")))?;
        for table in &self.tables {
            writer.write_event(Event::Start(
                BytesStart::new("Table").with_attributes([("Name", table.name.as_str())]),
            ))?;
            for column in &table.columns {
                writer.write_event(Event::Empty(BytesStart::new("Column").with_attributes([
                    ("Name", column.name.as_str()),
                    ("Type", column.kind.as_str()),
                ])))?;
            }
            writer.write_event(Event::Start(BytesStart::new("Stream").with_attributes([
                ("Name", table.name.as_str()),
                ("Type", "Local"),
                ("Delimiter", ","),
            ])))?;
            if !table.rows.is_empty() {
                let body = format_stream(table);
                writer.write_event(Event::Text(BytesText::from_escaped(partial_escape(&body))))?;
            }
            writer.write_event(Event::End(BytesEnd::new("Stream")))?;
            writer.write_event(Event::End(BytesEnd::new("Table")))?;
        }
        writer.write_event(Event::End(BytesEnd::new("LIGO_LW")))?;
        let mut out = writer.into_inner();
        out.write_all(b"\n")?;
        Ok(out)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let file = fs::File::create(path)?;
        self.to_writer(std::io::BufWriter::new(file))?.flush()?;
        info!("Wrote LIGO_LW document {:?}", path);
        Ok(())
    }
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.to_string()));
        }
    }
    Ok(None)
}

fn format_real(v: f64) -> String {
    // `{}` on f64 is the shortest representation that round-trips
    format!("{}", v)
}

fn format_stream(table: &Table) -> String {
    let lines: Vec<String> = table
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .zip(&table.columns)
                .map(|(cell, column)| {
                    if column.is_quoted() {
                        format!("\"{}\"", cell.replace('\\', "\\\\").replace('"', "\\\""))
                    } else {
                        cell.clone()
                    }
                })
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect();
    format!("\n{}\n", lines.join(",\n"))
}

/// Split a stream into rows of `width` cells, unquoting quoted tokens
fn parse_stream(text: &str, width: usize) -> Result<Vec<Vec<String>>> {
    let mut tokens: Vec<String> = Vec::new();
    let mut token = String::new();
    let mut in_quotes = false;
    // a token is pending once a quote or any non-blank character has been seen
    let mut pending = false;
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' if in_quotes => {
                if let Some(next) = chars.next() {
                    token.push(next);
                }
            }
            '"' => {
                in_quotes = !in_quotes;
                pending = true;
            }
            ',' if !in_quotes => {
                tokens.push(std::mem::take(&mut token));
                pending = false;
            }
            c if !in_quotes && c.is_whitespace() => {}
            c => {
                token.push(c);
                pending = true;
            }
        }
    }
    if in_quotes {
        return Err(Error::Document("unterminated quoted string in stream".into()));
    }
    if pending {
        tokens.push(token);
    }
    if width == 0 {
        return Ok(Vec::new());
    }
    if tokens.len() % width != 0 {
        return Err(Error::Document(format!(
            "stream holds {} cells, not a multiple of {} columns",
            tokens.len(),
            width
        )));
    }
    Ok(tokens.chunks(width).map(|c| c.to_vec()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(pairs: &[(&str, f64)]) -> OffsetVector {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn write_then_read_time_slides() {
        let mut doc = Document::new();
        let pid = doc.register_process("gwpipe_timeslides", "test", &[]);
        let ids = doc.append_time_slides(
            &pid,
            &[vector(&[("H1", 0.0), ("L1", 5.0)]), vector(&[("H1", 0.0), ("L1", -2.5)])],
        );
        assert_eq!(ids, vec!["time_slide:time_slide_id:0", "time_slide:time_slide_id:1"]);

        let bytes = doc.to_writer(Vec::new()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("<!DOCTYPE LIGO_LW"));
        assert!(text.contains(r#""time_slide:time_slide_id:1","L1",-2.5"#));

        let back = Document::from_xml(&text).unwrap();
        let slides = back.time_slides().unwrap();
        assert_eq!(slides.len(), 2);
        assert_eq!(slides["time_slide:time_slide_id:1"].get("L1"), Some(-2.5));
    }

    #[test]
    fn appending_continues_ids() {
        let mut doc = Document::new();
        let pid = doc.register_process("a", "", &[]);
        doc.append_time_slides(&pid, &[vector(&[("H1", 0.0)])]);
        let pid2 = doc.register_process("b", "", &[]);
        assert_eq!(pid2, "process:process_id:1");
        let ids = doc.append_time_slides(&pid2, &[vector(&[("H1", 1.0)])]);
        assert_eq!(ids, vec!["time_slide:time_slide_id:1"]);
    }

    #[test]
    fn stream_parsing_handles_quotes_and_trailing_delimiters() {
        let rows = parse_stream("\n \"a,b\",1,\n \"c\\\"d\",2,\n", 2).unwrap();
        assert_eq!(rows, vec![vec!["a,b".to_string(), "1".to_string()], vec!["c\"d".to_string(), "2".to_string()]]);
        assert!(parse_stream("\"a\",1,\"b\"", 2).is_err());
    }

    #[test]
    fn unknown_tables_survive_roundtrip() {
        let mut doc = Document::new();
        let mut other = Table::new("segment", &[("start_time", "int_4s")]);
        other.push_row(&[("start_time", "100".to_string())]);
        doc.tables.push(other);
        let text = String::from_utf8(doc.to_writer(Vec::new()).unwrap()).unwrap();
        let back = Document::from_xml(&text).unwrap();
        assert_eq!(back, doc);
    }
}
