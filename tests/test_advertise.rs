//! Building, verifying and registering provider advertisements.

mod common;

use common::{exchange_client, raw_cid, test_identity, FakeLedger, FakeServer, MNEMONIC};
use pkv_client::transport::ConnectClient;
use pkv_client::{
    compute_bundle_id, AdvertSpec, Advertiser, FixedQuantityAgent, Instance, PaymentEnvironment,
    ProviderAdvertise,
};
use std::sync::Arc;
use std::time::Duration;

fn advertiser() -> Advertiser {
    Advertiser::new(
        Arc::new(ConnectClient::default()),
        exchange_client(test_identity(MNEMONIC), Arc::new(FakeLedger::default())),
        Arc::new(FixedQuantityAgent::default()),
    )
}

fn spec(names: Vec<String>) -> AdvertSpec {
    AdvertSpec {
        provider_instance: Instance {
            did: String::new(),
            multiaddrs: vec!["/ip4/127.0.0.1/tcp/50051/http".to_string()],
            peer_id: String::new(),
        },
        resource_names: names,
        price: 42,
        exchanges: vec![Instance {
            did: "did:key:zExchange".to_string(),
            multiaddrs: vec!["/dns/exchange.example.org/tcp/443/https".to_string()],
            peer_id: String::new(),
        }],
        ttl: Duration::from_secs(3600),
    }
}

fn sample_names() -> Vec<String> {
    ["one", "two", "three"]
        .iter()
        .map(|s| format!("values/{}", raw_cid(s.as_bytes())))
        .collect()
}

#[test]
fn advertisement_names_its_bundle_and_is_signed() -> Result<(), Box<dyn std::error::Error>> {
    let identity = test_identity(MNEMONIC);
    let names = sample_names();
    let advert = advertiser().build(spec(names.clone()))?;

    let cids: Vec<String> = names
        .iter()
        .map(|n| n.trim_start_matches("values/").to_string())
        .collect();
    assert_eq!(advert.cids, cids);

    let provider = advert.provider_instance.as_ref().expect("provider");
    assert_eq!(provider.did, identity.did());

    let service = advert.virtual_service.as_ref().expect("service");
    assert_eq!(
        service.behavior_link.as_ref().map(|l| l.name.as_str()),
        Some("serve_all")
    );
    let variant = service.variant_link.as_ref().expect("variant");
    assert_eq!(variant.name, compute_bundle_id(&cids)?.to_string());
    assert_eq!(variant.maintainer, identity.did());

    assert_eq!(advert.price, Some(42));
    assert_eq!(advert.environment, Some(PaymentEnvironment::Devnet));
    let (update, expire) = (advert.update_time.expect("update"), advert.expire_time.expect("expire"));
    assert_eq!((expire - update).num_seconds(), 3600);
    assert_eq!(update.timestamp_subsec_nanos(), 0);

    assert!(!advert.signature.is_empty());
    assert!(Advertiser::verify(&advert)?);
    Ok(())
}

#[test]
fn tampering_breaks_the_signature() -> Result<(), Box<dyn std::error::Error>> {
    let advert = advertiser().build(spec(sample_names()))?;

    let mut cheaper = advert.clone();
    cheaper.price = Some(1);
    assert!(!Advertiser::verify(&cheaper)?);

    let mut reordered = advert.clone();
    reordered.cids.reverse();
    assert!(!Advertiser::verify(&reordered)?);

    let mut unsigned = advert.clone();
    unsigned.signature.clear();
    assert!(!Advertiser::verify(&unsigned)?);

    let mut impostor = advert;
    impostor.provider_instance = Some(Instance {
        did: test_identity(common::OTHER_MNEMONIC).did().to_string(),
        ..Default::default()
    });
    assert!(!Advertiser::verify(&impostor)?);
    Ok(())
}

#[test]
fn signature_survives_the_wire() -> Result<(), Box<dyn std::error::Error>> {
    let advert = advertiser().build(spec(sample_names()))?;
    let json = serde_json::to_string(&advert)?;
    assert!(json.contains("\"price\":\"42\""));
    assert!(json.contains("PAYMENT_ENVIRONMENT_DEVNET"));

    let parsed: ProviderAdvertise = serde_json::from_str(&json)?;
    assert_eq!(parsed, advert);
    assert!(Advertiser::verify(&parsed)?);
    Ok(())
}

#[test]
fn bad_inputs_are_rejected() {
    assert!(advertiser().build(spec(Vec::new())).is_err());
    assert!(advertiser()
        .build(spec(vec!["values/not-a-cid".to_string()]))
        .is_err());
    assert!(Advertiser::verify(&ProviderAdvertise::default()).is_err());
}

#[test]
fn bare_cids_and_resource_names_mix() -> Result<(), Box<dyn std::error::Error>> {
    let names = sample_names();
    let mut mixed = names.clone();
    mixed[1] = mixed[1].trim_start_matches("values/").to_string();

    let a = advertiser().build(spec(names))?;
    let b = advertiser().build(spec(mixed))?;
    assert_eq!(a.cids, b.cids);
    assert_eq!(
        a.virtual_service.and_then(|s| s.variant_link).map(|l| l.name),
        b.virtual_service.and_then(|s| s.variant_link).map(|l| l.name)
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn registration_pays_the_index_and_stores_the_advert(
) -> Result<(), Box<dyn std::error::Error>> {
    let index = FakeServer::start().await;
    let advertiser = advertiser();
    let advert = advertiser.build(spec(sample_names()))?;

    advertiser
        .register(&index.url, &index.url, &index.did, advert.clone())
        .await?;

    let counters = index.counters();
    assert_eq!(counters.buy_token, 1);
    assert_eq!(counters.create_session, 1);
    assert_eq!(counters.register_instance, 1);
    index.with_state(|st| {
        assert_eq!(st.audiences, vec![index.did.clone()]);
        let stored: ProviderAdvertise =
            serde_json::from_value(st.adverts[0].clone()).expect("stored advert");
        assert_eq!(stored, advert);
        assert!(Advertiser::verify(&stored).expect("verify"));
    });
    Ok(())
}

#[test]
fn oversized_ttl_is_a_configuration_error() {
    let mut huge = spec(sample_names());
    huge.ttl = Duration::from_secs(10_000_000_000_000);
    match advertiser().build(huge) {
        Err(pkv_client::Error::Config(_)) => {}
        other => panic!("expected a configuration error, got {other:?}"),
    }

    let mut max = spec(sample_names());
    max.ttl = Duration::MAX;
    assert!(matches!(
        advertiser().build(max),
        Err(pkv_client::Error::Config(_))
    ));
}
