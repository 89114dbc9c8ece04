//! Book identifier encoding for WeRead reader links.
//!
//! The web reader does not address books by their raw `bookId`. It expects an
//! obfuscated string derived from the id's MD5 digest and a hex rendering of
//! the id itself. [`canonical_id`] reproduces that derivation so every
//! highlight can link back to the book it came from.

const NUMERIC_CHUNK: usize = 9;
const MIN_BODY_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdMode {
    Numeric,
    Generic,
}

impl IdMode {
    fn classify(raw_id: &str) -> Self {
        if raw_id.bytes().all(|b| b.is_ascii_digit()) {
            IdMode::Numeric
        } else {
            IdMode::Generic
        }
    }

    fn code(&self) -> char {
        match self {
            IdMode::Numeric => '3',
            IdMode::Generic => '4',
        }
    }
}

fn md5_hex(input: &str) -> String {
    hex::encode(md5::compute(input.as_bytes()).0)
}

fn segments(raw_id: &str, mode: IdMode) -> Vec<String> {
    match mode {
        // ASCII digits only, so byte offsets are char offsets.
        IdMode::Numeric => raw_id
            .as_bytes()
            .chunks(NUMERIC_CHUNK)
            .map(|chunk| {
                let value = chunk
                    .iter()
                    .fold(0u64, |acc, b| acc * 10 + u64::from(b - b'0'));
                format!("{:x}", value)
            })
            .collect(),
        IdMode::Generic => {
            vec![raw_id.chars().map(|c| format!("{:x}", c as u32)).collect()]
        }
    }
}

/// Derives the reader identifier for a raw WeRead book id.
///
/// The output is deterministic and at least 23 characters long.
pub fn canonical_id(raw_id: &str) -> String {
    let digest = md5_hex(raw_id);
    let mode = IdMode::classify(raw_id);

    let mut result = String::with_capacity(32);
    result.push_str(&digest[..3]);
    result.push(mode.code());
    result.push('2');
    result.push_str(&digest[digest.len() - 2..]);

    let parts = segments(raw_id, mode)
        .into_iter()
        .map(|segment| format!("{:02x}{}", segment.len(), segment))
        .collect::<Vec<_>>();
    result.push_str(&parts.join("g"));

    if result.len() < MIN_BODY_LEN {
        let missing = MIN_BODY_LEN - result.len();
        result.push_str(&digest[..missing]);
    }

    let checksum = md5_hex(&result);
    result.push_str(&checksum[..3]);
    result
}

/// Web reader permalink for a book.
pub fn reader_url(base_url: &str, raw_id: &str) -> String {
    format!("{}/web/reader/{}", base_url.trim_end_matches('/'), canonical_id(raw_id))
}

/// Permalink to a single review (note) on the web.
pub fn review_url(base_url: &str, review_id: &str) -> String {
    format!(
        "{}/review-detail?reviewid={}&type=1",
        base_url.trim_end_matches('/'),
        urlencoding::encode(review_id)
    )
}
