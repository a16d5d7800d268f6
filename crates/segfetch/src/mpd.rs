//! # MPEG-DASH manifest parsing
//!
//! Only static, single-period manifests addressed with a numbered `SegmentTemplate` are
//! supported. The markup is deserialized into a fixed schema and every field a [`Track`]
//! needs is validated explicitly, so a malformed manifest fails with the name of the
//! missing or invalid attribute instead of producing a partial track list.
//!
//! ```no_run
//! # async fn run() -> segfetch::SegfetchResult<()> {
//! use segfetch::{mpd::Manifest, HttpClient, Url};
//!
//! let client = HttpClient::default();
//! let url = Url::parse("https://example.com/stream.mpd")?;
//! let manifest = Manifest::fetch(&client, &url, "video/webm").await?;
//! for (i, track) in manifest.tracks.iter().enumerate() {
//!     println!("{i}: {track}");
//! }
//! # Ok(())
//! # }
//! ```

use std::{borrow::Cow, fmt, str::FromStr};

use url::Url;

use crate::{
    duration::parse_duration,
    http::HttpClient,
    template::{MediaTemplate, Template},
    url::merge_baseurls,
    SegfetchError, SegfetchResult,
};

pub const DEFAULT_MIME_TYPE: &str = "video/webm";

const MPD_ACCEPT: &str = "application/dash+xml,video/vnd.mpeg.dash.mpd";

/// One quality variant of the presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: Option<String>,
    pub bandwidth: u64,
    pub width: u32,
    pub height: u32,
    pub frame_rate: String,
    pub codecs: String,

    pub media: MediaTemplate,
    pub initialization: Url,

    /// Segment duration in `timescale` units
    pub segment_duration: u64,
    pub start_number: u64,
    pub timescale: u64,
}

impl Track {
    /// Number of segments needed to cover `total_seconds` of presentation.
    pub fn segment_count(&self, total_seconds: f64) -> u64 {
        let segment_seconds = self.segment_duration as f64 / self.timescale as f64;
        (total_seconds / segment_seconds).ceil() as u64
    }

    pub fn media_url(&self, number: u64) -> SegfetchResult<Url> {
        Ok(Url::parse(&self.media.resolve(number))?)
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "res={}x{} fps={} codec=\"{}\" br={}",
            self.width, self.height, self.frame_rate, self.codecs, self.bandwidth
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    /// Presentation duration in seconds
    pub duration: f64,
    pub tracks: Vec<Track>,
}

impl Manifest {
    pub fn parse(text: &str, source: &Url) -> SegfetchResult<Self> {
        Self::parse_with_mime_type(text, source, DEFAULT_MIME_TYPE)
    }

    /// Parses `text`, retrieved from `source`, keeping the representations whose
    /// adaptation set carries `mime_type`.
    pub fn parse_with_mime_type(text: &str, source: &Url, mime_type: &str) -> SegfetchResult<Self> {
        let mpd: raw::Mpd = quick_xml::de::from_str(text)?;

        let duration = mpd
            .media_presentation_duration
            .as_deref()
            .ok_or_else(|| SegfetchError::missing("MPD", "mediaPresentationDuration"))?;
        let duration = parse_duration(duration)?;

        if mpd.periods.len() > 1 {
            return Err(SegfetchError::Unsupported(format!(
                "{} periods, only single period manifests are supported",
                mpd.periods.len()
            )));
        }

        let mut base_url = Cow::Borrowed(source);
        if let Some(mpd_base_url) = mpd.base_url.first() {
            base_url = Cow::Owned(merge_baseurls(&base_url, &mpd_base_url.base)?);
        }

        let mut tracks = Vec::new();
        for period in mpd.periods.iter() {
            let base_url = match period.base_url.first() {
                Some(period_base_url) => Cow::Owned(merge_baseurls(&base_url, &period_base_url.base)?),
                None => Cow::Borrowed(&*base_url),
            };

            for adaptation in period.adaptations.iter() {
                let adaptation_template =
                    single_template(&adaptation.segment_templates, "AdaptationSet")?;
                let base_url = match adaptation.base_url.first() {
                    Some(adaptation_base_url) => {
                        Cow::Owned(merge_baseurls(&base_url, &adaptation_base_url.base)?)
                    }
                    None => Cow::Borrowed(&*base_url),
                };

                for representation in adaptation.representations.iter() {
                    let representation_mime_type = adaptation
                        .mime_type
                        .as_deref()
                        .or(representation.mime_type.as_deref());
                    if representation_mime_type != Some(mime_type) {
                        continue;
                    }

                    let track = parse_track(
                        tracks.len(),
                        adaptation,
                        adaptation_template,
                        representation,
                        &base_url,
                    )?;
                    tracing::debug!(
                        index = tracks.len(),
                        bandwidth = track.bandwidth,
                        media = %track.media,
                        initialization = %track.initialization,
                        "Parsed representation"
                    );
                    tracks.push(track);
                }
            }
        }

        Ok(Self { duration, tracks })
    }

    /// Retrieves the manifest at `url` and parses it.
    pub async fn fetch(client: &HttpClient, url: &Url, mime_type: &str) -> SegfetchResult<Self> {
        let text = client.fetch_text(url, MPD_ACCEPT).await?;
        Self::parse_with_mime_type(&text, url, mime_type)
    }

    pub fn track(&self, index: usize) -> SegfetchResult<&Track> {
        self.tracks
            .get(index)
            .ok_or(SegfetchError::TrackIndexOutOfRange {
                index,
                count: self.tracks.len(),
            })
    }
}

fn single_template<'a>(
    templates: &'a [raw::SegmentTemplate],
    element: &str,
) -> SegfetchResult<Option<&'a raw::SegmentTemplate>> {
    match templates {
        [] => Ok(None),
        [template] => Ok(Some(template)),
        _ => Err(SegfetchError::Unsupported(format!(
            "{} SegmentTemplate elements on one {element}",
            templates.len()
        ))),
    }
}

fn parse_track(
    index: usize,
    adaptation: &raw::AdaptationSet,
    adaptation_template: Option<&raw::SegmentTemplate>,
    representation: &raw::Representation,
    base_url: &Url,
) -> SegfetchResult<Track> {
    let element = match representation.id.as_deref() {
        Some(id) => format!("Representation(id={id})"),
        None => format!("Representation #{index}"),
    };
    let required = |value: Option<&String>, field: &'static str| -> SegfetchResult<String> {
        value
            .cloned()
            .ok_or_else(|| SegfetchError::missing(element.as_str(), field))
    };

    let bandwidth = required(representation.bandwidth.as_ref(), "bandwidth")?;
    let bandwidth: u64 = parse_number(&element, "bandwidth", &bandwidth)?;
    let width = required(
        representation.width.as_ref().or(adaptation.width.as_ref()),
        "width",
    )?;
    let height = required(
        representation.height.as_ref().or(adaptation.height.as_ref()),
        "height",
    )?;
    let frame_rate = required(
        representation
            .frame_rate
            .as_ref()
            .or(adaptation.frame_rate.as_ref()),
        "frameRate",
    )?;
    let codecs = required(
        representation.codecs.as_ref().or(adaptation.codecs.as_ref()),
        "codecs",
    )?;

    let inner_template = single_template(&representation.segment_templates, &element)?;
    let segment_template = match (inner_template, adaptation_template) {
        (Some(inner), outer) => inner.clone().inherit(outer),
        (None, Some(outer)) => outer.clone(),
        (None, None) => return Err(SegfetchError::missing(element.as_str(), "SegmentTemplate")),
    };

    let media = required(segment_template.media.as_ref(), "media")?;
    let initialization = required(segment_template.initialization.as_ref(), "initialization")?;
    let segment_duration = required(segment_template.duration.as_ref(), "duration")?;
    let start_number = required(segment_template.start_number.as_ref(), "startNumber")?;
    let timescale = required(segment_template.timescale.as_ref(), "timescale")?;

    let segment_duration: u64 = parse_number(&element, "duration", &segment_duration)?;
    let start_number: u64 = parse_number(&element, "startNumber", &start_number)?;
    let timescale: u64 = parse_number(&element, "timescale", &timescale)?;
    if segment_duration == 0 {
        return Err(invalid(&element, "duration", "0"));
    }
    if timescale == 0 {
        return Err(invalid(&element, "timescale", "0"));
    }

    let base_url = match representation.base_url.first() {
        Some(representation_base_url) => {
            Cow::Owned(merge_baseurls(base_url, &representation_base_url.base)?)
        }
        None => Cow::Borrowed(base_url),
    };

    let mut params = Template::new();
    if let Some(id) = representation.id.clone() {
        params.insert(Template::REPRESENTATION_ID, id);
    }
    params.insert(Template::BANDWIDTH, bandwidth.to_string());

    let initialization = merge_baseurls(&base_url, &params.resolve(&initialization))?;
    let media = merge_baseurls(&base_url, &params.resolve(&media))?;
    let media = MediaTemplate::new(media.as_str())?;

    Ok(Track {
        id: representation.id.clone(),
        bandwidth,
        width: parse_number(&element, "width", &width)?,
        height: parse_number(&element, "height", &height)?,
        frame_rate,
        codecs,
        media,
        initialization,
        segment_duration,
        start_number,
        timescale,
    })
}

fn parse_number<T>(element: &str, field: &'static str, value: &str) -> SegfetchResult<T>
where
    T: FromStr,
{
    value.trim().parse().map_err(|_| invalid(element, field, value))
}

fn invalid(element: &str, field: &'static str, value: &str) -> SegfetchError {
    SegfetchError::InvalidAttribute {
        element: element.to_string(),
        field,
        value: value.to_string(),
    }
}

/// The subset of the MPD schema read by [`Manifest::parse`].
///
/// Attributes are kept as strings so that missing and malformed values can be reported
/// separately.
mod raw {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub(super) struct Mpd {
        #[serde(rename = "@mediaPresentationDuration")]
        pub media_presentation_duration: Option<String>,
        #[serde(rename = "BaseURL", default)]
        pub base_url: Vec<BaseUrl>,
        #[serde(rename = "Period", default)]
        pub periods: Vec<Period>,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct BaseUrl {
        #[serde(rename = "$text", default)]
        pub base: String,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct Period {
        #[serde(rename = "BaseURL", default)]
        pub base_url: Vec<BaseUrl>,
        #[serde(rename = "AdaptationSet", default)]
        pub adaptations: Vec<AdaptationSet>,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct AdaptationSet {
        #[serde(rename = "@mimeType")]
        pub mime_type: Option<String>,
        #[serde(rename = "@width")]
        pub width: Option<String>,
        #[serde(rename = "@height")]
        pub height: Option<String>,
        #[serde(rename = "@frameRate")]
        pub frame_rate: Option<String>,
        #[serde(rename = "@codecs")]
        pub codecs: Option<String>,
        #[serde(rename = "BaseURL", default)]
        pub base_url: Vec<BaseUrl>,
        #[serde(rename = "SegmentTemplate", default)]
        pub segment_templates: Vec<SegmentTemplate>,
        #[serde(rename = "Representation", default)]
        pub representations: Vec<Representation>,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct Representation {
        #[serde(rename = "@id")]
        pub id: Option<String>,
        #[serde(rename = "@mimeType")]
        pub mime_type: Option<String>,
        #[serde(rename = "@bandwidth")]
        pub bandwidth: Option<String>,
        #[serde(rename = "@width")]
        pub width: Option<String>,
        #[serde(rename = "@height")]
        pub height: Option<String>,
        #[serde(rename = "@frameRate")]
        pub frame_rate: Option<String>,
        #[serde(rename = "@codecs")]
        pub codecs: Option<String>,
        #[serde(rename = "BaseURL", default)]
        pub base_url: Vec<BaseUrl>,
        #[serde(rename = "SegmentTemplate", default)]
        pub segment_templates: Vec<SegmentTemplate>,
    }

    #[derive(Debug, Clone, Default, Deserialize)]
    pub(super) struct SegmentTemplate {
        #[serde(rename = "@media")]
        pub media: Option<String>,
        #[serde(rename = "@initialization")]
        pub initialization: Option<String>,
        #[serde(rename = "@duration")]
        pub duration: Option<String>,
        #[serde(rename = "@startNumber")]
        pub start_number: Option<String>,
        #[serde(rename = "@timescale")]
        pub timescale: Option<String>,
    }

    impl SegmentTemplate {
        /// Fills the attributes missing here from the enclosing adaptation set's template.
        pub fn inherit(self, parent: Option<&SegmentTemplate>) -> Self {
            let Some(parent) = parent else {
                return self;
            };
            Self {
                media: self.media.or_else(|| parent.media.clone()),
                initialization: self.initialization.or_else(|| parent.initialization.clone()),
                duration: self.duration.or_else(|| parent.duration.clone()),
                start_number: self.start_number.or_else(|| parent.start_number.clone()),
                timescale: self.timescale.or_else(|| parent.timescale.clone()),
            }
        }
    }
}
