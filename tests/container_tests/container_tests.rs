//! Tests for the container model and record codec
//!
//! These tests verify:
//! - Hash construction and length checks
//! - Attribute bounds
//! - Container encode/decode through a layout

use assortdb::layout::{RowLayout, ATTRIBUTES_LEN};
use assortdb::record;
use assortdb::{AssortError, Container, DocHash, DocRef, TermHash};

// =============================================================================
// Helper Functions
// =============================================================================

fn doc(hash: &str, attrs: &[u8]) -> DocRef {
    DocRef::new(DocHash::try_from(hash).unwrap(), attrs).unwrap()
}

// =============================================================================
// Hash Tests
// =============================================================================

#[test]
fn test_term_hash_from_str() {
    let hash = TermHash::try_from("aaaa00000000").unwrap();
    assert_eq!(hash.as_bytes(), b"aaaa00000000");
    assert_eq!(hash.to_string(), "aaaa00000000");
}

#[test]
fn test_term_hash_wrong_length() {
    assert!(matches!(TermHash::try_from("short"), Err(AssortError::Config(_))));
    assert!(matches!(
        TermHash::from_slice(&[0u8; 13]),
        Err(AssortError::Config(_))
    ));
}

#[test]
fn test_hashes_order_bytewise() {
    let a = TermHash::try_from("AAAA00000000").unwrap();
    let b = TermHash::try_from("aaaa00000000").unwrap();
    assert!(a < b);
}

// =============================================================================
// DocRef Tests
// =============================================================================

#[test]
fn test_attributes_at_limit_accepted() {
    let attrs = vec![b'x'; ATTRIBUTES_LEN];
    let r = DocRef::new(DocHash::try_from("docA00000000").unwrap(), attrs.clone()).unwrap();
    assert_eq!(r.attributes(), attrs.as_slice());
}

#[test]
fn test_attributes_over_limit_rejected() {
    let attrs = vec![b'x'; ATTRIBUTES_LEN + 1];
    let result = DocRef::new(DocHash::try_from("docA00000000").unwrap(), attrs);
    assert!(matches!(result, Err(AssortError::Config(_))));
}

#[test]
fn test_attributes_with_trailing_nul_rejected() {
    let result = DocRef::new(DocHash::try_from("docA00000000").unwrap(), b"ab\0".to_vec());
    assert!(matches!(result, Err(AssortError::Config(_))));
}

// =============================================================================
// Codec Tests
// =============================================================================

#[test]
fn test_encode_decode_preserves_order() {
    let layout = RowLayout::for_capacity(3).unwrap();
    let container = Container::new(
        TermHash::try_from("term00000001").unwrap(),
        -42,
        vec![
            doc("docC00000000", b"third"),
            doc("docA00000000", b""),
            doc("docB00000000", b"a\0b"),
        ],
    );

    let row = record::encode(&layout, &container);
    let decoded = record::decode(&layout, &row).unwrap();

    assert_eq!(decoded, container);
    let order: Vec<_> = decoded.iter().map(|r| r.doc_hash().to_string()).collect();
    assert_eq!(order, vec!["docC00000000", "docA00000000", "docB00000000"]);
}

#[test]
fn test_encoded_key_is_term_hash() {
    let layout = RowLayout::for_capacity(1).unwrap();
    let container = Container::new(
        TermHash::try_from("keykeykeykey").unwrap(),
        7,
        vec![doc("docA00000000", b"x")],
    );

    let row = record::encode(&layout, &container);

    assert_eq!(layout.key_of(&row), b"keykeykeykey");
    assert_eq!(record::occurrence_marker(&layout, &row), record::OCCURRENCE_MARKER);
}

#[test]
fn test_timestamp_extremes() {
    let layout = RowLayout::for_capacity(1).unwrap();
    for ts in [i64::MIN, 0, i64::MAX] {
        let container = Container::new(
            TermHash::try_from("keykeykeykey").unwrap(),
            ts,
            vec![doc("docA00000000", b"x")],
        );
        let decoded = record::decode(&layout, &record::encode(&layout, &container)).unwrap();
        assert_eq!(decoded.updated(), ts);
    }
}
