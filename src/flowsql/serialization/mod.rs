/*!
# Serialization Format Descriptors

Runtime descriptors for the serialization formats a source or sink
topic uses. The analyzer resolves these when building the output sink:
a key format (optionally windowed), a value format with
format-specific properties, and the set of serde options controlling
structural serialization behavior.

These types are serializable: the downstream planner embeds them in
durable physical plans.
*/

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::flowsql::sql::error::{AnalysisError, AnalysisResult};

/// Closed set of supported serialization formats.
///
/// `Kafka` is the raw format of the Kafka primitive serializers. It is
/// primarily a key format; using it as a value format rules out any
/// operation that needs a repartition or changelog topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Format {
    /// JSON for compatibility and readability
    Json,
    /// Apache Avro with schema registry integration
    Avro,
    /// Protocol Buffers
    Protobuf,
    /// Delimited text (CSV-style)
    Delimited,
    /// Raw Kafka primitive serialization
    Kafka,
}

impl Format {
    /// Canonical upper-case name used in SQL statements and messages
    pub fn name(&self) -> &'static str {
        match self {
            Format::Json => "JSON",
            Format::Avro => "AVRO",
            Format::Protobuf => "PROTOBUF",
            Format::Delimited => "DELIMITED",
            Format::Kafka => "KAFKA",
        }
    }

    /// Whether the format can toggle single-field value wrapping.
    /// Formats without a container representation can not.
    pub fn supports_wrapping(&self) -> bool {
        matches!(self, Format::Json | Format::Avro)
    }

    /// Format properties a sink inherits from its source when both
    /// use this format and the statement does not override them.
    pub fn inheritable_properties(&self) -> &'static [&'static str] {
        match self {
            Format::Avro => &["schema.name"],
            Format::Delimited => &["delimiter"],
            Format::Json | Format::Protobuf | Format::Kafka => &[],
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Format {
    type Err = UnknownFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "JSON" => Ok(Format::Json),
            "AVRO" => Ok(Format::Avro),
            "PROTOBUF" | "PROTO" => Ok(Format::Protobuf),
            "DELIMITED" | "CSV" => Ok(Format::Delimited),
            "KAFKA" => Ok(Format::Kafka),
            other => Err(UnknownFormatError {
                name: other.to_string(),
            }),
        }
    }
}

/// A format name that is not in the supported set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFormatError {
    pub name: String,
}

impl fmt::Display for UnknownFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unsupported format: '{}'. Supported formats: JSON, AVRO, PROTOBUF, DELIMITED, KAFKA",
            self.name
        )
    }
}

impl std::error::Error for UnknownFormatError {}

/// A format plus its format-specific properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatInfo {
    pub format: Format,
    pub properties: HashMap<String, String>,
}

impl FormatInfo {
    /// Format with no properties
    pub fn of(format: Format) -> Self {
        FormatInfo {
            format,
            properties: HashMap::new(),
        }
    }

    /// Format with explicit properties
    pub fn with_properties(format: Format, properties: HashMap<String, String>) -> Self {
        FormatInfo { format, properties }
    }
}

/// Window types a windowed key encoding can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowType {
    Tumbling,
    Hopping,
    Session,
}

impl fmt::Display for WindowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WindowType::Tumbling => "TUMBLING",
            WindowType::Hopping => "HOPPING",
            WindowType::Session => "SESSION",
        };
        write!(f, "{}", name)
    }
}

/// Window metadata embedded in a windowed key format.
/// Session windows have no fixed size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowInfo {
    pub window_type: WindowType,
    pub size: Option<Duration>,
}

/// Key format of a topic, optionally windowed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyFormat {
    pub format_info: FormatInfo,
    pub window_info: Option<WindowInfo>,
}

impl KeyFormat {
    /// Plain, non-windowed key format
    pub fn non_windowed(format_info: FormatInfo) -> Self {
        KeyFormat {
            format_info,
            window_info: None,
        }
    }

    /// Key format embedding a time-window boundary alongside the key
    pub fn windowed(format_info: FormatInfo, window_info: WindowInfo) -> Self {
        KeyFormat {
            format_info,
            window_info: Some(window_info),
        }
    }

    pub fn is_windowed(&self) -> bool {
        self.window_info.is_some()
    }

    /// Window type, if windowed
    pub fn window_type(&self) -> Option<WindowType> {
        self.window_info.as_ref().map(|w| w.window_type)
    }
}

/// Value format of a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueFormat {
    pub format_info: FormatInfo,
}

impl ValueFormat {
    pub fn of(format_info: FormatInfo) -> Self {
        ValueFormat { format_info }
    }

    pub fn format(&self) -> Format {
        self.format_info.format
    }
}

/// Serde option: a flag controlling structural serialization behavior
/// rather than the wire format itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SerdeOption {
    /// Serialize a single-field value bare, without its container
    UnwrapSingleValues,
}

/// Policy deriving the effective serde options for a created sink.
pub struct SerdeOptions;

impl SerdeOptions {
    /// Build the serde options for a CREATE ... AS SELECT sink.
    ///
    /// The explicit `wrap_single_values` directive wins over the
    /// engine defaults, but is rejected when the value format has no
    /// container representation to wrap with, or when the value
    /// schema has more than one field.
    pub fn build_for_create_as(
        value_column_count: usize,
        value_format: Format,
        wrap_single_values: Option<bool>,
        defaults: &std::collections::BTreeSet<SerdeOption>,
    ) -> AnalysisResult<std::collections::BTreeSet<SerdeOption>> {
        let single_field = value_column_count == 1;

        if wrap_single_values.is_some() && !value_format.supports_wrapping() {
            return Err(AnalysisError::invalid_serde_options(format!(
                "'WRAP_SINGLE_VALUE' can not be used with format '{}' \
                 as it does not support wrapping",
                value_format
            )));
        }

        if wrap_single_values.is_some() && !single_field {
            return Err(AnalysisError::invalid_serde_options(
                "'WRAP_SINGLE_VALUE' is only valid for single-field value schemas",
            ));
        }

        let mut options = std::collections::BTreeSet::new();
        if !single_field {
            return Ok(options);
        }

        match wrap_single_values {
            Some(false) => {
                options.insert(SerdeOption::UnwrapSingleValues);
            }
            Some(true) => {}
            None => {
                if defaults.contains(&SerdeOption::UnwrapSingleValues)
                    && value_format.supports_wrapping()
                {
                    options.insert(SerdeOption::UnwrapSingleValues);
                }
            }
        }

        Ok(options)
    }
}
