
/// Words whose frequency is tracked by the feature embedding.
const COMMON_WORDS: [&str; 10] = [
    "the", "and", "or", "but", "in", "on", "at", "to", "for", "of",
];

/// Deterministic hash-based embedding. This is the degraded path used when
/// no remote provider is reachable: the md5 hexdigest of the text is cycled
/// over the vector, then a few leading slots are overwritten with scalar
/// text features so near-duplicate short texts stay distinguishable.
#[inline]
pub fn hash_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let digest = format!("{:x}", md5::compute(text.as_bytes()));
    let codes: Vec<f32> = digest.bytes().map(|b| f32::from(b) / 255.0).collect();

    let mut embedding: Vec<f32> = (0..dimension).map(|i| codes[i % codes.len()]).collect();

    let char_count = text.chars().count();
    write_slot(&mut embedding, 0, char_count as f32 / 1000.0);
    write_slot(
        &mut embedding,
        1,
        ratio(text.chars().filter(|c| *c == ' ').count(), char_count),
    );
    write_slot(
        &mut embedding,
        2,
        ratio(text.chars().filter(|c| c.is_uppercase()).count(), char_count),
    );

    embedding
}

/// Feature-based embedding used on the remote path: scalar text statistics,
/// letter and common-word frequencies, and a digest-derived tail filling the
/// remaining slots.
#[inline]
pub fn feature_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let mut embedding = vec![0.0f32; dimension];

    let char_count = text.chars().count();
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();

    write_slot(&mut embedding, 0, char_count as f32 / 1000.0);
    write_slot(&mut embedding, 1, words.len() as f32 / 100.0);
    write_slot(
        &mut embedding,
        2,
        ratio(text.chars().filter(|c| *c == '.').count(), char_count),
    );
    write_slot(
        &mut embedding,
        3,
        ratio(text.chars().filter(|c| *c == '?').count(), char_count),
    );
    write_slot(
        &mut embedding,
        4,
        ratio(text.chars().filter(|c| *c == '!').count(), char_count),
    );

    for (i, letter) in ('a'..='z').enumerate() {
        let count = lower.chars().filter(|c| *c == letter).count();
        write_slot(&mut embedding, 10 + i, ratio(count, char_count));
    }

    for (i, word) in COMMON_WORDS.iter().enumerate() {
        let count = words.iter().filter(|w| *w == word).count();
        write_slot(&mut embedding, 50 + i, ratio(count, words.len()));
    }

    let seed = u64::from(text_seed(text));
    for (i, slot) in embedding.iter_mut().enumerate().skip(100) {
        *slot = ((seed * (i as u64 + 1)) % 1000) as f32 / 1000.0;
    }

    embedding
}

/// Stable 31-bit seed derived from the text digest.
fn text_seed(text: &str) -> u32 {
    let digest = md5::compute(text.as_bytes());
    let bytes: [u8; 4] = [digest.0[0], digest.0[1], digest.0[2], digest.0[3]];
    u32::from_be_bytes(bytes) & 0x7FFF_FFFF
}

fn write_slot(embedding: &mut [f32], index: usize, value: f32) {
    if let Some(slot) = embedding.get_mut(index) {
        *slot = value;
    }
}

fn ratio(count: usize, total: usize) -> f32 {
    if total == 0 {
        0.0
    } else {
        count as f32 / total as f32
    }
}
