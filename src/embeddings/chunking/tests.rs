use super::*;

/// Rebuild the source text by dropping each chunk's leading overlap
fn reassemble(chunks: &[String], overlap: usize) -> String {
    let mut text = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if i == 0 {
            text.push_str(chunk);
        } else {
            text.extend(chunk.chars().skip(overlap));
        }
    }
    text
}

fn last_chars(s: &str, n: usize) -> String {
    let count = s.chars().count();
    s.chars().skip(count - n).collect()
}

fn first_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

#[test]
fn default_config() {
    let config = ChunkingConfig::default();
    assert_eq!(config.chunk_size, 1000);
    assert_eq!(config.chunk_overlap, 150);
    assert!(config.validate().is_ok());
}

#[test]
fn repeated_text_produces_expected_lengths() {
    let text = "A".repeat(2400);
    let chunks = split_text(&text, 1000, 150).expect("split should succeed");

    let lengths = chunks.iter().map(|c| c.chars().count()).collect::<Vec<_>>();
    assert_eq!(lengths, vec![1000, 1000, 700]);
    assert_eq!(last_chars(&chunks[0], 150), first_chars(&chunks[1], 150));
    assert_eq!(last_chars(&chunks[1], 150), first_chars(&chunks[2], 150));
}

#[test]
fn short_text_is_single_chunk() {
    let chunks = split_text("abc", 1000, 150).expect("split should succeed");
    assert_eq!(chunks, vec!["abc".to_string()]);
}

#[test]
fn empty_text_yields_no_chunks() {
    let chunks = split_text("", 1000, 150).expect("split should succeed");
    assert!(chunks.is_empty());
}

#[test]
fn text_of_exactly_one_window() {
    let text = "x".repeat(1000);
    let chunks = split_text(&text, 1000, 150).expect("split should succeed");
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].len(), 1000);
}

#[test]
fn zero_overlap_partitions_text() {
    let chunks = split_text("abcdefghij", 3, 0).expect("split should succeed");
    assert_eq!(chunks, vec!["abc", "def", "ghi", "j"]);
}

#[test]
fn overlap_invariant_and_coverage_on_varied_text() {
    let text = (0..500)
        .map(|i| format!("word{} ", i))
        .collect::<String>();

    for (size, overlap) in [(1, 0), (7, 3), (64, 0), (100, 99), (250, 40), (5000, 10)] {
        let chunks = split_text(&text, size, overlap).expect("split should succeed");

        for pair in chunks.windows(2) {
            assert_eq!(pair[0].chars().count(), size);
            assert_eq!(
                last_chars(&pair[0], overlap),
                first_chars(&pair[1], overlap),
                "overlap mismatch for size {size}, overlap {overlap}"
            );
        }

        let last_len = chunks.last().map_or(0, |c| c.chars().count());
        assert!((1..=size).contains(&last_len));
        assert_eq!(reassemble(&chunks, overlap), text);
    }
}

#[test]
fn multibyte_characters_are_counted_as_characters() {
    let text = "ação çé ñü 日本語テキスト".repeat(20);
    let chunks = split_text(&text, 10, 4).expect("split should succeed");

    assert!(chunks.iter().rev().skip(1).all(|c| c.chars().count() == 10));
    assert_eq!(reassemble(&chunks, 4), text);
}

#[test]
fn splitting_is_deterministic() {
    let text = "The quick brown fox jumps over the lazy dog. ".repeat(80);
    let first = split_text(&text, 300, 45).expect("split should succeed");
    let second = split_text(&text, 300, 45).expect("split should succeed");
    assert_eq!(first, second);
}

#[test]
fn invalid_window_is_rejected() {
    assert_eq!(split_text("abc", 0, 0), Err(ChunkingError::InvalidSize(0)));
    assert_eq!(
        split_text("abc", 10, 10),
        Err(ChunkingError::OverlapTooLarge {
            overlap: 10,
            size: 10
        })
    );
    assert!(
        ChunkingConfig {
            chunk_size: 100,
            chunk_overlap: 200
        }
        .validate()
        .is_err()
    );
}

#[test]
fn chunk_document_numbers_chunks_in_order() {
    let config = ChunkingConfig {
        chunk_size: 4,
        chunk_overlap: 1,
    };
    let chunks = chunk_document("abcdefghij", &config).expect("chunking should succeed");

    assert_eq!(
        chunks,
        vec![
            DocumentChunk {
                index: 0,
                content: "abcd".to_string()
            },
            DocumentChunk {
                index: 1,
                content: "defg".to_string()
            },
            DocumentChunk {
                index: 2,
                content: "ghij".to_string()
            },
        ]
    );
}
