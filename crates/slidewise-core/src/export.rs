//! Result export to CSV and spreadsheet formats.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::types::{RowSet, Tool};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Download format of a job result.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
    /// SpreadsheetML workbook, readable by spreadsheet applications.
    Xlsx,
}

impl ExportFormat {
    /// MIME type of the rendered document.
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Csv => "text/csv; charset=utf-8",
            Self::Xlsx => "application/vnd.ms-excel",
        }
    }

    /// File extension of the rendered document.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Xlsx => "xls",
        }
    }
}

/// Download file name, e.g. `wr_1b4e28ba.csv`.
pub fn file_name(tool: Tool, job_id: Uuid, format: ExportFormat) -> String {
    let id = job_id.simple().to_string();
    format!("{}_{}.{}", tool.namespace(), &id[..8], format.extension())
}

/// Renders rows as UTF-8 CSV with a byte order mark and CRLF line endings.
pub fn to_csv(rows: &RowSet) -> Vec<u8> {
    let mut out = String::new();
    push_csv_record(&mut out, rows.tool().headers().iter().copied());
    for record in rows.to_records() {
        push_csv_record(&mut out, record.iter().map(String::as_str));
    }

    let mut bytes = UTF8_BOM.to_vec();
    bytes.extend_from_slice(out.as_bytes());
    bytes
}

fn push_csv_record<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    for (i, field) in fields.enumerate() {
        if i > 0 {
            out.push(',');
        }
        if field.contains([',', '"', '\n', '\r']) {
            out.push('"');
            out.push_str(&field.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(field);
        }
    }
    out.push_str("\r\n");
}

/// Renders rows as a single-sheet SpreadsheetML 2003 workbook.
pub fn to_spreadsheet(rows: &RowSet) -> Vec<u8> {
    let tool = rows.tool();
    let mut xml = String::from(concat!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
        "<?mso-application progid=\"Excel.Sheet\"?>\n",
        "<Workbook xmlns=\"urn:schemas-microsoft-com:office:spreadsheet\" ",
        "xmlns:ss=\"urn:schemas-microsoft-com:office:spreadsheet\">\n",
        "<Styles><Style ss:ID=\"header\"><Font ss:Bold=\"1\"/></Style></Styles>\n",
    ));

    xml.push_str(&format!(
        "<Worksheet ss:Name=\"{}\">\n<Table>\n",
        escape_xml(tool.sheet_name())
    ));
    for header in tool.headers() {
        let width = (header.len() + 2).max(18) * 7;
        xml.push_str(&format!("<Column ss:Width=\"{width}\"/>\n"));
    }

    xml.push_str("<Row>");
    for header in tool.headers() {
        xml.push_str(&format!(
            "<Cell ss:StyleID=\"header\"><Data ss:Type=\"String\">{}</Data></Cell>",
            escape_xml(header)
        ));
    }
    xml.push_str("</Row>\n");

    for record in rows.to_records() {
        xml.push_str("<Row>");
        for (i, value) in record.iter().enumerate() {
            let kind = if i == 0 { "Number" } else { "String" };
            xml.push_str(&format!(
                "<Cell><Data ss:Type=\"{kind}\">{}</Data></Cell>",
                escape_xml(value)
            ));
        }
        xml.push_str("</Row>\n");
    }

    xml.push_str("</Table>\n</Worksheet>\n</Workbook>\n");
    xml.into_bytes()
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            '\n' => escaped.push_str("&#10;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ResultRow, ReviewRow};

    #[test]
    fn csv_has_bom_header_and_quoting() {
        let rows = RowSet::Revisions(vec![ResultRow::new(2, "Cost, not value", "Say \"cost\"")]);
        let bytes = to_csv(&rows);

        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        assert_eq!(
            text,
            "Page,Original,Revised\r\n2,\"Cost, not value\",\"Say \"\"cost\"\"\"\r\n"
        );
    }

    #[test]
    fn review_csv_uses_review_headers() {
        let rows = RowSet::Reviews(vec![ReviewRow {
            page: 1,
            spelling: "teh".into(),
            ..Default::default()
        }]);
        let text = String::from_utf8(to_csv(&rows)[3..].to_vec()).unwrap();
        assert!(text.starts_with("Page,Spelling,Grammar,Logic\r\n1,teh,,\r\n"));
    }

    #[test]
    fn spreadsheet_escapes_markup() {
        let rows = RowSet::Revisions(vec![ResultRow::new(5, "R&D <core>", "R&D core")]);
        let xml = String::from_utf8(to_spreadsheet(&rows)).unwrap();

        assert!(xml.contains("ss:Name=\"Wording Revision\""));
        assert!(xml.contains("<Data ss:Type=\"Number\">5</Data>"));
        assert!(xml.contains("R&amp;D &lt;core&gt;"));
    }

    #[test]
    fn file_names_use_id_prefix() {
        let id = Uuid::parse_str("1b4e28ba-2fa1-11d2-883f-0016d3cca427").unwrap();
        assert_eq!(file_name(Tool::WordingRevision, id, ExportFormat::Csv), "wr_1b4e28ba.csv");
        assert_eq!(file_name(Tool::SlideReview, id, ExportFormat::Xlsx), "sr_1b4e28ba.xls");
        assert_eq!("XLSX".parse::<ExportFormat>().unwrap(), ExportFormat::Xlsx);
    }
}
