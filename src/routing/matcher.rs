//! Path pattern matching.
//!
//! # Responsibilities
//! - Parse path templates with at most one `{name}` parameter segment
//! - Match request paths segment by segment
//! - Render backend path templates from captured parameters
//!
//! # Design Decisions
//! - Literal segments are case-sensitive
//! - A parameter matches exactly one non-empty segment and is required
//! - A single trailing slash is ignored on both patterns and paths
//! - Captured values are substituted verbatim (no decode/re-encode)

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern `{0}` must start with '/'")]
    MissingLeadingSlash(String),

    #[error("pattern `{0}` declares more than one parameter")]
    MultipleParameters(String),

    #[error("pattern `{0}` contains a malformed parameter segment")]
    MalformedParameter(String),

    #[error("template references unknown parameter `{0}`")]
    UnknownParameter(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// Parameters captured by a successful match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(Vec<(String, String)>);

impl PathParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn insert(&mut self, name: &str, value: &str) {
        self.0.push((name.to_string(), value.to_string()));
    }
}

/// A compiled path template such as `/sales/sku/{sku}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        let parts = split_segments(raw)
            .ok_or_else(|| PatternError::MissingLeadingSlash(raw.to_string()))?;

        let mut segments = Vec::with_capacity(parts.len());
        let mut params = 0;
        for part in parts {
            if let Some(inner) = part.strip_prefix('{') {
                let name = inner
                    .strip_suffix('}')
                    .filter(|name| !name.is_empty() && !name.contains(['{', '}']))
                    .ok_or_else(|| PatternError::MalformedParameter(raw.to_string()))?;
                params += 1;
                if params > 1 {
                    return Err(PatternError::MultipleParameters(raw.to_string()));
                }
                segments.push(Segment::Param(name.to_string()));
            } else if part.contains(['{', '}']) {
                return Err(PatternError::MalformedParameter(raw.to_string()));
            } else {
                segments.push(Segment::Literal(part.to_string()));
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Name of the parameter segment, if the pattern has one.
    pub fn param_name(&self) -> Option<&str> {
        self.segments.iter().find_map(|segment| match segment {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Match a request path, capturing the parameter value.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let parts = split_segments(path)?;
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = PathParams::default();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Param(name) if !part.is_empty() => params.insert(name, part),
                _ => return None,
            }
        }
        Some(params)
    }

    /// Substitute captured parameters into this template.
    pub fn render(&self, params: &PathParams) -> Result<String, PatternError> {
        if self.segments.is_empty() {
            return Ok("/".to_string());
        }

        let mut path = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            path.push('/');
            match segment {
                Segment::Literal(literal) => path.push_str(literal),
                Segment::Param(name) => {
                    let value = params
                        .get(name)
                        .ok_or_else(|| PatternError::UnknownParameter(name.clone()))?;
                    path.push_str(value);
                }
            }
        }
        Ok(path)
    }
}

fn split_segments(path: &str) -> Option<Vec<&str>> {
    let rest = path.strip_prefix('/')?;
    let rest = rest.strip_suffix('/').unwrap_or(rest);
    if rest.is_empty() {
        return Some(Vec::new());
    }
    Some(rest.split('/').collect())
}
