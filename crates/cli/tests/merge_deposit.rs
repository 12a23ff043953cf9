use std::{fs, path::Path};

use clap::Parser;
use mockito::Matcher;
use serde_json::{json, Value};
use ssv_automate_cmd::MergeDepositCommand;

fn write_validator(root: &Path, ceremony: &str, index: u32, pubkey: &str, nonce: u64) {
    let dir = root.join(ceremony).join(format!("{index}-0x{pubkey}"));
    fs::create_dir_all(&dir).unwrap();
    let deposit = json!([{
        "pubkey": pubkey,
        "withdrawal_credentials": "010000000000000000000000aa184b86b4cdb747f4a3bf6e6fcd5e27c1d92c5c",
        "amount": 32000000000u64,
        "signature": "b0",
        "deposit_message_root": "c1",
        "deposit_data_root": "d2",
        "fork_version": "01017000",
        "network_name": "holesky",
        "deposit_cli_version": "2.7.0"
    }]);
    let keyshares = json!({
        "version": "v1.1.0",
        "createdAt": "2024-05-01T10:00:00.000Z",
        "shares": [{
            "data": {
                "ownerNonce": nonce,
                "ownerAddress": "0xaa184b86b4cdb747f4a3bf6e6fcd5e27c1d92c5c",
                "publicKey": format!("0x{pubkey}"),
                "operators": [{"id": 1, "operatorKey": "LS0t1"}]
            },
            "payload": {
                "publicKey": format!("0x{pubkey}"),
                "operatorIds": [1, 2, 3, 4],
                "sharesData": "0xabcd"
            }
        }]
    });
    fs::write(dir.join("deposit_data.json"), deposit.to_string()).unwrap();
    fs::write(dir.join("keyshares.json"), keyshares.to_string()).unwrap();
}

fn pubkeys(output: &Path) -> Vec<String> {
    let merged: Value = serde_json::from_str(&fs::read_to_string(output).unwrap()).unwrap();
    merged
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["pubkey"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn merges_in_owner_nonce_order() -> eyre::Result<()> {
    let root = tempfile::tempdir()?;
    write_validator(root.path(), "ceremony-a", 0, "aa03", 3);
    write_validator(root.path(), "ceremony-b", 0, "aa01", 1);
    let output = root.path().join("merged.json");

    let command = MergeDepositCommand::try_parse_from([
        "merge-deposit",
        root.path().to_str().unwrap(),
        "-o",
        output.to_str().unwrap(),
    ])?;
    command.execute().await?;

    assert_eq!(pubkeys(&output), vec!["aa01", "aa03"]);
    let merged: Value = serde_json::from_str(&fs::read_to_string(&output)?)?;
    assert_eq!(merged[0]["deposit_cli_version"], "2.7.0");
    Ok(())
}

#[tokio::test]
async fn refuses_partial_merge() -> eyre::Result<()> {
    let root = tempfile::tempdir()?;
    write_validator(root.path(), "ceremony-a", 0, "aa01", 1);
    write_validator(root.path(), "ceremony-a", 1, "aa02", 2);
    fs::remove_file(root.path().join("ceremony-a/1-0xaa02/keyshares.json"))?;
    let output = root.path().join("merged.json");

    let command = MergeDepositCommand::try_parse_from([
        "merge-deposit",
        root.path().to_str().unwrap(),
        "-o",
        output.to_str().unwrap(),
    ])?;
    assert!(command.execute().await.is_err());
    assert!(!output.exists());
    Ok(())
}

#[tokio::test]
async fn filters_by_registration_transactions() -> eyre::Result<()> {
    let root = tempfile::tempdir()?;
    write_validator(root.path(), "ceremony-a", 0, "aa01", 1);
    write_validator(root.path(), "ceremony-b", 0, "aa02", 2);
    write_validator(root.path(), "ceremony-c", 0, "aa03", 3);
    let output = root.path().join("merged.json");

    let mut server = mockito::Server::new_async().await;
    let tx_hashes = ["0x1111", "0x3333"];
    let subgraph = server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({ "variables": { "txhashes": tx_hashes } })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "data": {
                    "validatorAddeds": [
                        {"publicKey": "0xAA03"},
                        {"publicKey": "0xaa01"}
                    ]
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let subgraph_api = format!("{}/", server.url());
    let command = MergeDepositCommand::try_parse_from([
        "merge-deposit",
        root.path().to_str().unwrap(),
        "-t",
        "0x1111,0x3333",
        "-o",
        output.to_str().unwrap(),
        "--subgraph-api",
        subgraph_api.as_str(),
    ])?;
    command.execute().await?;

    subgraph.assert_async().await;
    assert_eq!(pubkeys(&output), vec!["aa01", "aa03"]);
    Ok(())
}

#[tokio::test]
async fn refuses_merge_with_missing_registered_validator() -> eyre::Result<()> {
    let root = tempfile::tempdir()?;
    write_validator(root.path(), "ceremony-a", 0, "aa01", 1);
    let output = root.path().join("merged.json");

    let mut server = mockito::Server::new_async().await;
    let _subgraph = server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "data": {
                    "validatorAddeds": [
                        {"publicKey": "0xaa01"},
                        {"publicKey": "0xaa02"}
                    ]
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let subgraph_api = format!("{}/", server.url());
    let command = MergeDepositCommand::try_parse_from([
        "merge-deposit",
        root.path().to_str().unwrap(),
        "-t",
        "0x1111",
        "-o",
        output.to_str().unwrap(),
        "--subgraph-api",
        subgraph_api.as_str(),
    ])?;
    let err = command.execute().await.unwrap_err();
    assert!(format!("{err:#}").contains("aa02"));
    assert!(!output.exists());
    Ok(())
}
