//! Bundle identifiers: regression vector, order sensitivity, edge cases.

mod common;

use common::raw_cid;
use pkv_client::crypto::hashing::{hash_pair, keccak256};
use pkv_client::domain::commitment::{bundle_root, KECCAK_256};
use pkv_client::{compute_bundle_id, Error};

const CHUNKS: [&str; 7] = [
    "bafkreifrr35ii732h6si7yfk7vfgeufkkeuxidqfcjufsn326igo3l665y",
    "bafkreibhewxkfuw6u43pxy4oihwlkghwbgglncwhonrmly2pvl5tkzlhyu",
    "bafkreifw6pavqrh6cl4wnlmq3nm5vazsvgtntx6rtcwihfe34icf5rw4dy",
    "bafkreig72n2ea5obvz2menip6y2evs6mpxt3kvm53kprith3jsv5nipb3u",
    "bafkreih5lr4boybzf2kmu5nygkayazmohepzfn5yzf6nc6xujxbl6xg6te",
    "bafkreigb7egxenbrk6cvqzozc5frsmk45i322tn7zar5bu4ufejydexnya",
    "bafkreiggwkopdqv4udjp4cuvledbe5s2dhamq6quzm2l66zosts2akbsce",
];

#[test]
fn chunk_cids_are_the_raw_sha256_cids() {
    for (i, expected) in CHUNKS.iter().enumerate() {
        let cid = raw_cid(format!("chunk-{i}").as_bytes());
        assert_eq!(cid.to_string(), *expected);
    }
}

#[test]
fn seven_cid_regression_vector() -> Result<(), Box<dyn std::error::Error>> {
    let bundle = compute_bundle_id(&CHUNKS)?;
    assert_eq!(
        bundle.to_string(),
        "bafkrwiawewn6pfldby7uudiecbad5wamwwybrd4qa2o4khh7e6khi5wcwi"
    );
    assert_eq!(bundle.codec(), 0x55);
    assert_eq!(bundle.hash().code(), KECCAK_256);

    // Deterministic across calls.
    assert_eq!(compute_bundle_id(&CHUNKS)?, bundle);
    Ok(())
}

#[test]
fn order_matters() -> Result<(), Box<dyn std::error::Error>> {
    let forward = compute_bundle_id(&CHUNKS[..2])?;
    let reversed = compute_bundle_id(&[CHUNKS[1], CHUNKS[0]])?;
    assert_eq!(
        forward.to_string(),
        "bafkrwierz5snboiggkes466csdw2j3c5vz6k7wlnbu565fclqzg5rvkb6u"
    );
    assert_eq!(
        reversed.to_string(),
        "bafkrwihtm5viuunhozyvj6gvuw3p6kbnrm3zisvf5nmnn54qpks7pzpgtu"
    );
    assert_ne!(forward, reversed);
    Ok(())
}

#[test]
fn single_cid_is_its_own_leaf() -> Result<(), Box<dyn std::error::Error>> {
    let cid: cid::Cid = CHUNKS[0].parse()?;
    assert_eq!(bundle_root(&CHUNKS[..1])?, keccak256(&cid.to_bytes()));
    assert_eq!(
        compute_bundle_id(&CHUNKS[..1])?.to_string(),
        "bafkrwicpccd3ywvfbdyb6u3mcfjqxn6v4ajorrm7xn6u6cnpze2tdxl2bq"
    );
    Ok(())
}

#[test]
fn odd_levels_pad_with_zero_leaves() -> Result<(), Box<dyn std::error::Error>> {
    let leaves: Vec<_> = CHUNKS[..3]
        .iter()
        .map(|s| keccak256(&s.parse::<cid::Cid>().expect("cid").to_bytes()))
        .collect();
    let zero = primitive_types::H256::zero();
    let expected = hash_pair(&hash_pair(&leaves[0], &leaves[1]), &hash_pair(&leaves[2], &zero));
    assert_eq!(bundle_root(&CHUNKS[..3])?, expected);
    Ok(())
}

#[test]
fn empty_list_is_rejected() {
    let empty: [&str; 0] = [];
    assert!(matches!(compute_bundle_id(&empty), Err(Error::EmptyBundle)));
}

#[test]
fn invalid_cid_is_rejected() {
    let result = compute_bundle_id(&[CHUNKS[0], "not-a-cid"]);
    match result {
        Err(Error::InvalidCid { input, .. }) => assert_eq!(input, "not-a-cid"),
        other => panic!("expected InvalidCid, got {other:?}"),
    }
}
