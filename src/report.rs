use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One supervisor's daily submission for one project, as resolved by the record
/// store before the export begins. The renderer never mutates it: everything in
/// here is read-only for the duration of one export call.
///
/// Every field may be absent from the upstream JSON, in which case it defaults to
/// an empty value; the drawers substitute a visible `-` placeholder for blank
/// display fields so the printed page stays visually stable.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportRecord {
    /// The calendar date of the report, as a display string.
    pub date: String,
    /// The display name of the project. The upstream store may return it as a
    /// multi-value list, which is joined into one trimmed string on the way in.
    #[serde(deserialize_with = "deserialize_multi_value_name")]
    pub project_name: String,
    /// The display name of the supervisor, preferred over the id.
    pub supervisor_name: String,
    /// The record id of the supervisor, used as a fallback when the name is blank.
    pub supervisor_id: String,
    /// Optional free text with the general remarks of the day, possibly multi-line.
    pub general_comment: String,
    pub fabrication_activities: Vec<String>,
    pub installation_activities: Vec<String>,
    pub supervision_activities: Vec<String>,
    /// The selected downtime reason, blank when no downtime was reported.
    pub downtime_reason: String,
    /// Free text filled in only when the downtime reason is the sentinel "Otro".
    pub downtime_reason_other: String,
    /// The selected pending item, blank when nothing is pending.
    pub pending_item: String,
    /// Free text filled in only when the pending item is the sentinel "Otro".
    pub pending_item_other: String,
    /// The quantified line items of the report, in submission order.
    pub metrics: Vec<MetricsRow>,
    /// The already-uploaded photo URLs, in capture order. This order is the
    /// photo-page order of the exported document.
    pub photos: Vec<String>,
}

impl ReportRecord {
    /// The supervisor display identity: the name when present, the id otherwise.
    pub fn supervisor_display(&self) -> &str {
        if self.supervisor_name.trim().is_empty() {
            &self.supervisor_id
        } else {
            &self.supervisor_name
        }
    }

    /// Whether any of the four incident fields carries text.
    pub fn has_incidents(&self) -> bool {
        [
            &self.downtime_reason,
            &self.downtime_reason_other,
            &self.pending_item,
            &self.pending_item_other,
        ]
        .iter()
        .any(|field| !field.trim().is_empty())
    }
}

/// One quantified line item within a report. The upstream store does not tag the
/// rows: their shape varies by project type and is recognized by which keys are
/// present. The variant is assigned once, here at the deserialization boundary,
/// so the drawers never have to re-derive the shape from key presence.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum MetricsRow {
    /// The "coded measurement" shape, `{code, measurement, quantity}`.
    #[serde(rename_all = "camelCase")]
    Coded {
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        measurement: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        quantity: Option<Value>,
    },
    /// The "categorized item" shape, `{category, itemLabel, quantity}`.
    #[serde(rename_all = "camelCase")]
    Categorized {
        #[serde(skip_serializing_if = "Option::is_none")]
        category: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        item_label: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        quantity: Option<Value>,
    },
    /// Any row matching neither recognized shape. It is not an error: the row is
    /// kept as-is and rendered through the structured fallback.
    Opaque(Value),
}

impl MetricsRow {
    /// Assigns the variant from the raw row by key presence. A row claiming both
    /// shapes at once is treated as categorized, matching the upstream behavior.
    pub fn classify(raw_row: Value) -> MetricsRow {
        let Value::Object(mut row) = raw_row else {
            return MetricsRow::Opaque(raw_row);
        };

        let has_coded_shape = row.contains_key("code") || row.contains_key("measurement");
        let has_categorized_shape = row.contains_key("category") || row.contains_key("itemLabel");

        if has_categorized_shape {
            MetricsRow::Categorized {
                category: take_string(&mut row, "category"),
                item_label: take_string(&mut row, "itemLabel"),
                quantity: row.remove("quantity"),
            }
        } else if has_coded_shape {
            MetricsRow::Coded {
                code: take_string(&mut row, "code"),
                measurement: take_string(&mut row, "measurement"),
                quantity: row.remove("quantity"),
            }
        } else {
            MetricsRow::Opaque(Value::Object(row))
        }
    }

    /// Formats the row as the single dash-prefixed line the metrics block draws.
    /// Sub-fields are present only when their source value is present, joined
    /// with ` | `; unrecognized rows dump their raw structured form.
    pub fn formatted_line(&self) -> String {
        match self {
            MetricsRow::Coded {
                code,
                measurement,
                quantity,
            } => {
                let mut parts = Vec::new();
                if let Some(code) = code {
                    parts.push(format!("Código: {}", code));
                }
                if let Some(measurement) = measurement {
                    parts.push(format!("Medida: {}", measurement));
                }
                if let Some(quantity) = quantity {
                    parts.push(format!("Cantidad: {}", display_value(quantity)));
                }
                format!("- {}", parts.join(" | "))
            }
            MetricsRow::Categorized {
                category,
                item_label,
                quantity,
            } => {
                let mut parts = Vec::new();
                if let Some(category) = category {
                    parts.push(format!("Categoría: {}", category));
                }
                if let Some(item_label) = item_label {
                    parts.push(format!("Item: {}", item_label));
                }
                if let Some(quantity) = quantity {
                    parts.push(format!("Cantidad: {}", display_value(quantity)));
                }
                format!("- {}", parts.join(" | "))
            }
            MetricsRow::Opaque(raw_row) => format!("- {}", raw_row),
        }
    }
}

impl<'de> Deserialize<'de> for MetricsRow {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw_row = Value::deserialize(deserializer)?;
        Ok(MetricsRow::classify(raw_row))
    }
}

/// Removes a key from the row and renders it as display text. Non-string values
/// survive as their JSON rendition rather than being dropped.
fn take_string(row: &mut serde_json::Map<String, Value>, key: &str) -> Option<String> {
    row.remove(key).map(|value| display_value(&value))
}

/// Display form of a metric sub-field: strings render bare, everything else
/// renders as compact JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Substitutes the visible placeholder for blank display fields so a label line
/// never renders with nothing after the colon.
pub fn display_or_placeholder(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        "-"
    } else {
        trimmed
    }
}

/// The download filename of the exported document:
/// `reporte_<slugified-project>_<digits-and-dashes-only-date>.pdf`.
pub fn export_file_name(report: &ReportRecord) -> String {
    let project = report.project_name.trim();
    let project_slug = if project.is_empty() {
        "reporte".to_string()
    } else {
        slugify(project)
    };
    let safe_date: String = report
        .date
        .chars()
        .filter(|character| character.is_ascii_digit() || *character == '-')
        .collect();

    format!("reporte_{}_{}.pdf", project_slug, safe_date)
}

/// Lower-cases the text and replaces every run of non-alphanumeric characters
/// with a single hyphen.
fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut previous_was_hyphen = false;
    for character in text.to_lowercase().chars() {
        if character.is_ascii_alphanumeric() {
            slug.push(character);
            previous_was_hyphen = false;
        } else if !previous_was_hyphen {
            slug.push('-');
            previous_was_hyphen = true;
        }
    }

    slug
}

/// Deserializes a display name that the upstream store may return either as one
/// string or as a multi-value list, joining the list with single spaces.
fn deserialize_multi_value_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MultiValueName {
        One(String),
        Many(Vec<String>),
    }

    let name = match MultiValueName::deserialize(deserializer)? {
        MultiValueName::One(name) => name,
        MultiValueName::Many(names) => names.join(" "),
    };

    Ok(name.trim().to_string())
}
