use prometheus::{Encoder, ProtobufEncoder, proto::MetricFamily};
use tracing::{debug, warn};

use promfed_core::MetricCache;

use crate::{EncodeError, ExpositionFormat, FamilyFilter, text};

/// Append the encoding of `family` to `out`.
///
/// On error `out` is left untouched, so a failing family never leaves a partial record.
pub fn encode_family(
    format: ExpositionFormat,
    family: &MetricFamily,
    out: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    let mut buf = Vec::new();
    let res = match format {
        ExpositionFormat::Text => {
            let mut text = String::new();
            text::write_family(family, &mut text).map(|()| buf = text.into_bytes())
        }
        ExpositionFormat::Protobuf => {
            ProtobufEncoder::new().encode(std::slice::from_ref(family), &mut buf)
        }
    };
    res.map_err(|source| EncodeError::Encode {
        family: family.name().to_string(),
        source,
    })?;
    out.extend_from_slice(&buf);
    Ok(())
}

/// Encode every cached family selected by `filter`.
///
/// Families that fail to encode are logged and skipped; the rest of the body is still produced.
pub fn render(cache: &MetricCache, filter: &FamilyFilter, format: ExpositionFormat) -> Vec<u8> {
    let mut body = Vec::new();
    let mut emitted = 0usize;

    cache.visit(|name, family| {
        let Some(family) = filter.apply(name, family) else {
            return;
        };
        match encode_family(format, &family, &mut body) {
            Ok(()) => emitted += 1,
            Err(e) => warn!(metric_name = %name, error = %e, "Error when encoding exp fmt"),
        }
    });

    debug!(families = emitted, bytes = body.len(), ?format, "rendered exposition");
    body
}
