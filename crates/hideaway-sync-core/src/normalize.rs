use crate::model::{Category, Document, Record};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use hideaway_config::{AppConfig, MessageTypeCodes};
use serde::Serialize;
use thiserror::Error;

const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M:%S%.f%z"];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Why a record produced no document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("record has no ID")]
    MissingId,
    #[error("record ID `{0}` cannot be used as a file name")]
    UnsafeId(String),
    #[error("no {field} found")]
    MissingDate { field: String },
    #[error("invalid {field} `{raw}`")]
    InvalidDate { field: String, raw: String },
    #[error("{0} was already produced by an earlier record")]
    DuplicateFile(String),
    #[error("failed to render frontmatter: {0}")]
    Render(String),
}

#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    pub codes: MessageTypeCodes,
    pub date_field: String,
    pub name_fields: Vec<String>,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for NormalizeOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            codes: config.message_types,
            date_field: config.fields.date.clone(),
            name_fields: config.fields.names.clone(),
        }
    }
}

/// Parses the send date in any of the shapes Baserow date fields produce.
/// Values without an offset are taken as UTC.
pub fn parse_send_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(raw, format) {
            return Some(parsed.with_timezone(&Utc));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
}

pub fn format_send_date(date: &DateTime<Utc>) -> String {
    date.format(CANONICAL_DATE_FORMAT).to_string()
}

fn check_file_id(id: String) -> Result<String, Rejection> {
    let unsafe_id = id == "."
        || id == ".."
        || id.contains(['/', '\\'])
        || id.chars().any(char::is_control);
    if unsafe_id {
        return Err(Rejection::UnsafeId(id));
    }
    Ok(id)
}

/// Frontmatter keys in emission order. Absent values are left out.
#[derive(Debug, Serialize)]
struct Frontmatter<'a> {
    title: &'a str,
    date: String,
    #[serde(rename = "msgType")]
    msg_type: i64,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    label: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    msgimage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    button1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    button2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    button3: Option<String>,
}

pub fn normalize_record(record: &Record, options: &NormalizeOptions) -> Result<Document, Rejection> {
    let id = check_file_id(record.id().ok_or(Rejection::MissingId)?)?;

    let raw_date = record
        .scalar(&options.date_field)
        .filter(|raw| !raw.trim().is_empty())
        .ok_or_else(|| Rejection::MissingDate {
            field: options.date_field.clone(),
        })?;
    let date = parse_send_date(&raw_date).ok_or_else(|| Rejection::InvalidDate {
        field: options.date_field.clone(),
        raw: raw_date.clone(),
    })?;

    let type_code = record.type_code();
    let category = Category::classify(type_code, &options.codes);

    let body = record.text("message").unwrap_or_default();
    let body = match category {
        Category::Secret => body.to_uppercase(),
        Category::Message | Category::System => body.to_string(),
    };

    let frontmatter = Frontmatter {
        title: &id,
        date: format_send_date(&date),
        msg_type: type_code.unwrap_or(0),
        label: category.label(),
        username: record.display_name(&options.name_fields),
        avatar: record.first_url("avatar"),
        msgimage: record.first_url("Image"),
        button1: record.scalar("button 1 text"),
        button2: record.scalar("button 2 text"),
        button3: record.scalar("button 3 text"),
    };
    let rendered =
        serde_yaml::to_string(&frontmatter).map_err(|exc| Rejection::Render(exc.to_string()))?;

    let mut content = String::from("---\n");
    content.push_str(&rendered);
    content.push_str("---\n\n");
    if !body.is_empty() {
        content.push_str(&body);
        if !body.ends_with('\n') {
            content.push('\n');
        }
    }

    Ok(Document {
        id,
        category,
        content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn record(value: Value) -> Record {
        Record::from_value(value).expect("fixture is an object")
    }

    fn normalize(value: Value) -> Result<Document, Rejection> {
        normalize_record(&record(value), &NormalizeOptions::default())
    }

    fn body_of(doc: &Document) -> &str {
        doc.content
            .split_once("---\n\n")
            .map(|(_, body)| body)
            .expect("document has a frontmatter separator")
    }

    fn frontmatter_of(doc: &Document) -> serde_yaml::Mapping {
        let yaml = doc
            .content
            .strip_prefix("---\n")
            .and_then(|rest| rest.split_once("---\n\n"))
            .map(|(yaml, _)| yaml)
            .expect("document has a fenced frontmatter");
        serde_yaml::from_str(yaml).expect("frontmatter is valid yaml")
    }

    fn keys_of(mapping: &serde_yaml::Mapping) -> Vec<&str> {
        mapping.keys().filter_map(|key| key.as_str()).collect()
    }

    fn str_at<'a>(mapping: &'a serde_yaml::Mapping, key: &str) -> Option<&'a str> {
        mapping.get(key).and_then(|value| value.as_str())
    }

    #[test]
    fn missing_date_is_rejected() {
        let err = normalize(json!({"ID": 3, "message": "hello"})).expect_err("no date");
        assert_eq!(
            err,
            Rejection::MissingDate {
                field: "Send-Date".to_string()
            }
        );

        let err = normalize(json!({"ID": 3, "Send-Date": ""})).expect_err("empty date");
        assert!(matches!(err, Rejection::MissingDate { .. }));
    }

    #[test]
    fn unparseable_date_is_rejected() {
        for raw in ["tomorrow", "2024-13-45", "20/01/2024", "2024-02-30T10:00:00Z"] {
            let err = normalize(json!({"ID": 3, "Send-Date": raw}))
                .expect_err("invalid date should be rejected");
            assert_eq!(
                err,
                Rejection::InvalidDate {
                    field: "Send-Date".to_string(),
                    raw: raw.to_string()
                }
            );
        }
    }

    #[test]
    fn missing_or_unsafe_id_is_rejected() {
        let err = normalize(json!({"Send-Date": "2024-01-20T15:30:00Z"})).expect_err("no id");
        assert_eq!(err, Rejection::MissingId);

        let err = normalize(json!({"ID": "../etc", "Send-Date": "2024-01-20T15:30:00Z"}))
            .expect_err("path id");
        assert_eq!(err, Rejection::UnsafeId("../etc".to_string()));
    }

    #[test]
    fn date_shapes_normalize_to_canonical_utc() {
        let cases = [
            ("2024-01-20T15:30:00Z", "2024-01-20T15:30:00Z"),
            ("2024-01-20T15:30:00.123Z", "2024-01-20T15:30:00Z"),
            ("2024-01-20T17:30:00+02:00", "2024-01-20T15:30:00Z"),
            ("2024-01-20 10:30:00-05:00", "2024-01-20T15:30:00Z"),
            ("2024-01-20T15:30:00", "2024-01-20T15:30:00Z"),
            ("2024-01-20 15:30", "2024-01-20T15:30:00Z"),
            ("2024-01-20", "2024-01-20T00:00:00Z"),
        ];
        for (raw, expected) in cases {
            let parsed = parse_send_date(raw).unwrap_or_else(|| panic!("parse {raw}"));
            assert_eq!(format_send_date(&parsed), expected, "input {raw}");
        }
    }

    #[test]
    fn secret_body_is_uppercased() {
        let doc = normalize(json!({
            "ID": 1,
            "Send-Date": "2024-01-20T15:30:00Z",
            "message": "hi there, straße",
            "msgType": {"id": 4753, "value": "secret"}
        }))
        .expect("valid secret");

        assert_eq!(doc.category, Category::Secret);
        assert_eq!(body_of(&doc), "HI THERE, STRASSE\n");
        assert_eq!(str_at(&frontmatter_of(&doc), "type"), Some("secret"));
    }

    #[test]
    fn system_and_plain_messages_keep_body() {
        let system = normalize(json!({
            "ID": 7,
            "Send-Date": "2024-01-20T15:30:00Z",
            "message": "Connection lost",
            "msgType": {"id": 4754}
        }))
        .expect("valid system");
        assert_eq!(system.category, Category::System);
        assert_eq!(body_of(&system), "Connection lost\n");
        let fm = frontmatter_of(&system);
        assert_eq!(str_at(&fm, "type"), Some("system"));
        assert_eq!(fm.get("msgType").and_then(|v| v.as_i64()), Some(4754));

        let plain = normalize(json!({
            "ID": 8,
            "Send-Date": "2024-01-20T15:30:00Z",
            "message": "hello",
            "msgType": {"id": 1}
        }))
        .expect("valid message");
        assert_eq!(plain.category, Category::Message);
        let fm = frontmatter_of(&plain);
        assert!(!fm.contains_key("type"));
        assert_eq!(fm.get("msgType").and_then(|v| v.as_i64()), Some(1));
    }

    #[test]
    fn frontmatter_is_ordered_and_skips_absent_keys() {
        let doc = normalize(json!({
            "ID": 42,
            "Send-Date": "2024-01-20T15:30:00Z",
            "message": "Meet me at the \"pier\".",
            "nickname": [],
            "characterlink": [{"id": 9, "value": "Vesper"}],
            "avatar": [{"url": "https://cdn.example/v.png"}],
            "Image": [],
            "button 1 text": "Yes",
            "button 2 text": "",
            "button 3 text": "Later"
        }))
        .expect("valid record");

        assert!(doc.content.starts_with("---\ntitle: "));
        assert!(doc.content.contains("\ndate: 2024-01-20T15:30:00Z\n"));
        assert_eq!(body_of(&doc), "Meet me at the \"pier\".\n");
        assert_eq!(doc.file_name(), "00042-message.md");

        let fm = frontmatter_of(&doc);
        assert_eq!(
            keys_of(&fm),
            ["title", "date", "msgType", "username", "avatar", "button1", "button3"]
        );
        assert_eq!(str_at(&fm, "title"), Some("42"));
        assert_eq!(str_at(&fm, "date"), Some("2024-01-20T15:30:00Z"));
        assert_eq!(fm.get("msgType").and_then(|v| v.as_i64()), Some(0));
        assert_eq!(str_at(&fm, "username"), Some("Vesper"));
        assert_eq!(str_at(&fm, "avatar"), Some("https://cdn.example/v.png"));
        assert_eq!(str_at(&fm, "button1"), Some("Yes"));
        assert_eq!(str_at(&fm, "button3"), Some("Later"));
    }

    #[test]
    fn control_characters_survive_a_yaml_round_trip() {
        let doc = normalize(json!({
            "ID": 9,
            "Send-Date": "2024-01-20T15:30:00Z",
            "button 1 text": "ok\u{1b}[1m",
            "nickname": [{"value": "a\u{7}b"}]
        }))
        .expect("valid record");

        let fm = frontmatter_of(&doc);
        assert_eq!(str_at(&fm, "title"), Some("9"));
        assert_eq!(str_at(&fm, "username"), Some("a\u{7}b"));
        assert_eq!(str_at(&fm, "button1"), Some("ok\u{1b}[1m"));
    }

    #[test]
    fn yaml_lookalike_values_stay_strings() {
        let doc = normalize(json!({
            "ID": 11,
            "Send-Date": "2024-01-20T15:30:00Z",
            "nickname": [{"value": "true"}],
            "button 1 text": "null",
            "button 2 text": "key: value\n- item",
            "button 3 text": "#hash"
        }))
        .expect("valid record");

        let fm = frontmatter_of(&doc);
        assert_eq!(str_at(&fm, "username"), Some("true"));
        assert_eq!(str_at(&fm, "button1"), Some("null"));
        assert_eq!(str_at(&fm, "button2"), Some("key: value\n- item"));
        assert_eq!(str_at(&fm, "button3"), Some("#hash"));
    }

    #[test]
    fn button_labels_keep_surrounding_whitespace() {
        let doc = normalize(json!({
            "ID": " 12 ",
            "Send-Date": " 2024-01-20T15:30:00Z ",
            "button 1 text": " Yes ",
            "button 2 text": "   "
        }))
        .expect("valid record");

        assert_eq!(doc.file_name(), "00012-message.md");
        let fm = frontmatter_of(&doc);
        assert_eq!(str_at(&fm, "title"), Some("12"));
        assert_eq!(str_at(&fm, "date"), Some("2024-01-20T15:30:00Z"));
        assert_eq!(str_at(&fm, "button1"), Some(" Yes "));
        assert_eq!(str_at(&fm, "button2"), Some("   "));
    }

    #[test]
    fn whitespace_only_date_counts_as_missing() {
        let err = normalize(json!({"ID": 3, "Send-Date": "   "})).expect_err("blank date");
        assert!(matches!(err, Rejection::MissingDate { .. }));
    }

    #[test]
    fn empty_body_ends_after_separator() {
        let doc = normalize(json!({"ID": 5, "Send-Date": "2024-01-20"})).expect("valid record");
        assert!(doc.content.ends_with("---\n\n"));
    }

    #[test]
    fn custom_date_field_and_codes_are_honoured() {
        let mut config = AppConfig::default();
        config.fields.date = "Sent".to_string();
        config.message_types.secret = 4727;
        let options = NormalizeOptions::from(&config);

        let doc = normalize_record(
            &record(json!({
                "ID": 2,
                "Sent": "2024-03-01T08:00:00Z",
                "message": "psst",
                "msgType": {"id": 4727}
            })),
            &options,
        )
        .expect("valid record");
        assert_eq!(doc.file_name(), "00002-secret.md");
        assert_eq!(body_of(&doc), "PSST\n");
    }
}
