use time::{format_description::well_known::Rfc3339, OffsetDateTime};

pub(crate) fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

pub(crate) fn format_offset(value: OffsetDateTime) -> String {
    value.format(&Rfc3339).unwrap_or_else(|_| value.to_string())
}

/// Whole seconds between two instants, floored at zero.
pub(crate) fn elapsed_seconds(start: OffsetDateTime, end: OffsetDateTime) -> u64 {
    let seconds = (end - start).whole_seconds();
    u64::try_from(seconds).unwrap_or(0)
}
