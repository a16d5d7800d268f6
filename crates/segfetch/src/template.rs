// References:
// 1. https://github.com/clitic/vsd/blob/30ca1985e4a467ea3304b11c08d3176deaafd22a/vsd/src/dash/template.rs
// 2. https://github.com/emarsden/dash-mpd-rs/blob/6ebdfb4759adbda8233b5b3520804e23ff86e7de/src/fetch.rs#L435-L466

use regex::{Regex, Replacer};
use std::{collections::HashMap, fmt, sync::LazyLock};

use crate::{SegfetchError, SegfetchResult};

// From https://dashif.org/docs/DASH-IF-IOP-v4.3.pdf:
// "For the avoidance of doubt, only %0[width]d is permitted and no other identifiers. The reason
// is that such a string replacement can be easily implemented without requiring a specific library."
//
// Example template: "$RepresentationID$/$Number%06d$.m4s"
static TEMPLATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(RepresentationID|Number|Time|Bandwidth)(?:%0(\d+)d)?\$").unwrap()
});

/// Substitutes the per-representation identifiers of a template.
///
/// Identifiers without a value are kept as-is, so `$Number$` survives until
/// it is split into a [`MediaTemplate`].
pub struct Template<'a> {
    args: HashMap<&'a str, String>,
}

impl Template<'_> {
    pub const REPRESENTATION_ID: &'static str = "RepresentationID";
    pub const NUMBER: &'static str = "Number";
    pub const TIME: &'static str = "Time";
    pub const BANDWIDTH: &'static str = "Bandwidth";

    pub fn new() -> Self {
        Self {
            args: HashMap::with_capacity(2),
        }
    }

    pub fn insert(&mut self, key: &'static str, value: String) {
        self.args.insert(key, value);
    }

    pub fn resolve(&self, template: &str) -> String {
        TEMPLATE_REGEX
            .replace_all(template, TemplateReplacer(&self.args))
            .to_string()
    }
}

impl Default for Template<'_> {
    fn default() -> Self {
        Self::new()
    }
}

struct TemplateReplacer<'a>(&'a HashMap<&'a str, String>);

impl Replacer for TemplateReplacer<'_> {
    fn replace_append(&mut self, caps: &regex::Captures<'_>, dst: &mut String) {
        let Some(value) = self.0.get(&caps[1]) else {
            dst.push_str(&caps[0]);
            return;
        };

        match caps.get(2).and_then(|m| m.as_str().parse::<usize>().ok()) {
            Some(width) => dst.push_str(&format!("{value:0>width$}")),
            None => dst.push_str(value),
        }
    }
}

/// A media URL split around its single `$Number$` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaTemplate {
    prefix: String,
    suffix: String,
    /// Zero padding width from `$Number%0<width>d$`
    width: Option<usize>,
}

impl MediaTemplate {
    pub fn new(template: &str) -> SegfetchResult<Self> {
        let mut number = None;
        for caps in TEMPLATE_REGEX.captures_iter(template) {
            let ident = caps[1].to_string();
            if ident == Template::NUMBER {
                if number.is_some() {
                    return Err(SegfetchError::InvalidTemplate(format!(
                        "more than one $Number$ in {template}"
                    )));
                }
                number = Some(caps);
            } else if ident == Template::TIME {
                return Err(SegfetchError::Unsupported(format!(
                    "$Time$ based addressing in {template}"
                )));
            } else {
                return Err(SegfetchError::InvalidTemplate(format!(
                    "unresolved ${ident}$ in {template}"
                )));
            }
        }

        let caps = number.ok_or_else(|| {
            SegfetchError::InvalidTemplate(format!("no $Number$ in {template}"))
        })?;
        let token = caps.get(0).unwrap();
        let width = caps
            .get(2)
            .map(|m| {
                m.as_str()
                    .parse::<usize>()
                    .map_err(|_| SegfetchError::InvalidTemplate(template.to_string()))
            })
            .transpose()?;

        Ok(Self {
            prefix: template[..token.start()].to_string(),
            suffix: template[token.end()..].to_string(),
            width,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Builds the media URL of segment `number`.
    pub fn resolve(&self, number: u64) -> String {
        match self.width {
            Some(width) => format!("{}{number:0>width$}{}", self.prefix, self.suffix),
            None => format!("{}{number}{}", self.prefix, self.suffix),
        }
    }
}

impl fmt::Display for MediaTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.width {
            Some(width) => write!(f, "{}$Number%0{width}d${}", self.prefix, self.suffix),
            None => write!(f, "{}$Number${}", self.prefix, self.suffix),
        }
    }
}
