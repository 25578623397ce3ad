//! Create, mint and transfer a token end to end against the in-memory
//! ledger, using only the crate's public API.

use ledger_client::memory::MetadataRecord;
use ledger_client::*;

fn opos() -> TokenMetadata {
    TokenMetadata {
        name: "Only Possible On Solana".into(),
        symbol: "OPOS".into(),
        uri: "https://raw.githubusercontent.com/solana-developers/opos-asset/main/assets/Climate/metadata.json".into(),
        is_mutable: true,
    }
}

async fn create_token(
    client: &SolanaClient<MemoryLedger>,
    payer: &KeyPairSigner,
    mint: &KeyPairSigner,
) -> String {
    let bh = client
        .rpc()
        .get_latest_blockhash(Commitment::Confirmed)
        .await
        .unwrap();
    let tx = build_create_token_transaction(&CreateTokenParams {
        fee_payer: payer,
        latest_blockhash: &bh,
        mint,
        metadata: opos(),
        decimals: 2,
        compute_unit_limit: None,
        compute_unit_price: None,
    })
    .unwrap();
    let signed = sign_transaction_message_with_signers(&tx).unwrap();
    client.send_and_confirm_transaction(&signed).await.unwrap()
}

async fn mint_tokens(
    client: &SolanaClient<MemoryLedger>,
    payer: &KeyPairSigner,
    mint: Address,
    amount: u64,
) -> String {
    let bh = client
        .rpc()
        .get_latest_blockhash(Commitment::Confirmed)
        .await
        .unwrap();
    let tx = build_mint_tokens_transaction(&MintTokensParams {
        fee_payer: payer,
        latest_blockhash: &bh,
        mint,
        mint_authority: payer,
        amount,
        destination: payer.address(),
        token_program: None,
        compute_unit_limit: None,
        compute_unit_price: None,
    })
    .unwrap();
    let signed = sign_transaction_message_with_signers(&tx).unwrap();
    client.send_and_confirm_transaction(&signed).await.unwrap()
}

fn transfer_params<'a>(
    payer: &'a KeyPairSigner,
    bh: &'a LatestBlockhash,
    mint: Address,
    destination: Address,
    amount: u64,
) -> TransferTokensParams<'a> {
    TransferTokensParams {
        fee_payer: payer,
        latest_blockhash: bh,
        mint,
        authority: payer,
        amount,
        destination,
        source_ata: None,
        token_program: None,
        compute_unit_limit: None,
        compute_unit_price: None,
    }
}

#[tokio::test]
async fn full_lifecycle_balances() {
    let client = SolanaClient::new(MemoryLedger::new(), Cluster::Localnet);
    let alice = KeyPairSigner::generate();
    let bob = KeyPairSigner::generate().address();
    let mint = KeyPairSigner::generate();

    let create_sig = create_token(&client, &alice, &mint).await;
    let mint_sig = mint_tokens(&client, &alice, mint.address(), 1000).await;

    let bh = client
        .rpc()
        .get_latest_blockhash(Commitment::Confirmed)
        .await
        .unwrap();
    let tx = build_transfer_tokens_transaction(&transfer_params(
        &alice,
        &bh,
        mint.address(),
        bob,
        900,
    ))
    .unwrap();
    let signed = sign_transaction_message_with_signers(&tx).unwrap();
    let transfer_sig = client.send_and_confirm_transaction(&signed).await.unwrap();

    assert_ne!(create_sig, mint_sig);
    assert_ne!(mint_sig, transfer_sig);

    let ledger = client.rpc();
    let state = ledger.mint(&mint.address()).unwrap();
    assert_eq!(state.supply, 1000);
    assert_eq!(state.decimals, 2);
    assert_eq!(state.mint_authority, Some(alice.address()));
    assert_eq!(state.freeze_authority, Some(alice.address()));

    let alice_ata =
        derive_associated_token_address(&alice.address(), &mint.address(), &TOKEN_PROGRAM_ID)
            .unwrap();
    let bob_ata = derive_associated_token_address(&bob, &mint.address(), &TOKEN_PROGRAM_ID).unwrap();

    let alice_balance = ledger
        .get_token_account_balance(&alice_ata, Commitment::Confirmed)
        .await
        .unwrap();
    let bob_balance = ledger
        .get_token_account_balance(&bob_ata, Commitment::Confirmed)
        .await
        .unwrap();
    assert_eq!(alice_balance.raw().unwrap(), 100);
    assert_eq!(alice_balance.ui_amount_string, "1.00");
    assert_eq!(bob_balance.raw().unwrap(), 900);
    assert_eq!(bob_balance.ui_amount_string, "9.00");
}

#[tokio::test]
async fn metadata_is_attached_to_mint() {
    let client = SolanaClient::new(MemoryLedger::new(), Cluster::Localnet);
    let alice = KeyPairSigner::generate();
    let mint = KeyPairSigner::generate();
    create_token(&client, &alice, &mint).await;

    let record = client.rpc().metadata(&mint.address()).unwrap();
    assert_eq!(
        record,
        MetadataRecord {
            mint: mint.address(),
            update_authority: alice.address(),
            name: "Only Possible On Solana".into(),
            symbol: "OPOS".into(),
            uri: opos().uri,
            is_mutable: true,
        }
    );
}

#[tokio::test]
async fn creating_same_mint_twice_fails() {
    let client = SolanaClient::new(MemoryLedger::new(), Cluster::Localnet);
    let alice = KeyPairSigner::generate();
    let mint = KeyPairSigner::generate();
    create_token(&client, &alice, &mint).await;

    let bh = client
        .rpc()
        .get_latest_blockhash(Commitment::Confirmed)
        .await
        .unwrap();
    let tx = build_create_token_transaction(&CreateTokenParams {
        fee_payer: &alice,
        latest_blockhash: &bh,
        mint: &mint,
        metadata: opos(),
        decimals: 2,
        compute_unit_limit: None,
        compute_unit_price: None,
    })
    .unwrap();
    let signed = sign_transaction_message_with_signers(&tx).unwrap();
    let err = client.send_and_confirm_transaction(&signed).await.unwrap_err();
    assert!(err.to_string().contains("already in use"));
}

#[tokio::test]
async fn transfer_more_than_balance_fails_and_leaves_balances() {
    let client = SolanaClient::new(MemoryLedger::new(), Cluster::Localnet);
    let alice = KeyPairSigner::generate();
    let bob = KeyPairSigner::generate().address();
    let mint = KeyPairSigner::generate();
    create_token(&client, &alice, &mint).await;
    mint_tokens(&client, &alice, mint.address(), 1000).await;

    let bh = client
        .rpc()
        .get_latest_blockhash(Commitment::Confirmed)
        .await
        .unwrap();
    let tx = build_transfer_tokens_transaction(&transfer_params(
        &alice,
        &bh,
        mint.address(),
        bob,
        1001,
    ))
    .unwrap();
    let signed = sign_transaction_message_with_signers(&tx).unwrap();
    assert!(client.send_and_confirm_transaction(&signed).await.is_err());

    let alice_ata =
        derive_associated_token_address(&alice.address(), &mint.address(), &TOKEN_PROGRAM_ID)
            .unwrap();
    let bob_ata = derive_associated_token_address(&bob, &mint.address(), &TOKEN_PROGRAM_ID).unwrap();
    assert_eq!(client.rpc().token_account(&alice_ata).unwrap().amount, 1000);
    // The idempotent ATA create rolled back with the failed transfer.
    assert!(client.rpc().token_account(&bob_ata).is_none());
}

#[tokio::test]
async fn zero_transfer_lands_and_opens_recipient_account() {
    let client = SolanaClient::new(MemoryLedger::new(), Cluster::Localnet);
    let alice = KeyPairSigner::generate();
    let bob = KeyPairSigner::generate().address();
    let mint = KeyPairSigner::generate();
    create_token(&client, &alice, &mint).await;
    mint_tokens(&client, &alice, mint.address(), 1000).await;

    let bh = client
        .rpc()
        .get_latest_blockhash(Commitment::Confirmed)
        .await
        .unwrap();
    let tx =
        build_transfer_tokens_transaction(&transfer_params(&alice, &bh, mint.address(), bob, 0))
            .unwrap();
    let signed = sign_transaction_message_with_signers(&tx).unwrap();
    client.send_and_confirm_transaction(&signed).await.unwrap();

    let alice_ata =
        derive_associated_token_address(&alice.address(), &mint.address(), &TOKEN_PROGRAM_ID)
            .unwrap();
    let bob_ata = derive_associated_token_address(&bob, &mint.address(), &TOKEN_PROGRAM_ID).unwrap();
    assert_eq!(client.rpc().token_account(&alice_ata).unwrap().amount, 1000);
    assert_eq!(client.rpc().token_account(&bob_ata).unwrap().amount, 0);
}

#[tokio::test]
async fn minting_twice_reuses_the_ata() {
    let client = SolanaClient::new(MemoryLedger::new(), Cluster::Localnet);
    let alice = KeyPairSigner::generate();
    let mint = KeyPairSigner::generate();
    create_token(&client, &alice, &mint).await;
    mint_tokens(&client, &alice, mint.address(), 1000).await;
    mint_tokens(&client, &alice, mint.address(), 250).await;

    let alice_ata =
        derive_associated_token_address(&alice.address(), &mint.address(), &TOKEN_PROGRAM_ID)
            .unwrap();
    assert_eq!(client.rpc().token_account(&alice_ata).unwrap().amount, 1250);
    assert_eq!(client.rpc().mint(&mint.address()).unwrap().supply, 1250);
}

#[tokio::test]
async fn mint_by_non_authority_fails() {
    let client = SolanaClient::new(MemoryLedger::new(), Cluster::Localnet);
    let alice = KeyPairSigner::generate();
    let mallory = KeyPairSigner::generate();
    let mint = KeyPairSigner::generate();
    create_token(&client, &alice, &mint).await;

    let bh = client
        .rpc()
        .get_latest_blockhash(Commitment::Confirmed)
        .await
        .unwrap();
    let tx = build_mint_tokens_transaction(&MintTokensParams {
        fee_payer: &mallory,
        latest_blockhash: &bh,
        mint: mint.address(),
        mint_authority: &mallory,
        amount: 1,
        destination: mallory.address(),
        token_program: None,
        compute_unit_limit: None,
        compute_unit_price: None,
    })
    .unwrap();
    let signed = sign_transaction_message_with_signers(&tx).unwrap();
    assert!(client.send_and_confirm_transaction(&signed).await.is_err());
    assert_eq!(client.rpc().mint(&mint.address()).unwrap().supply, 0);
}

#[test]
fn explorer_links_follow_cluster() {
    let devnet = create_solana_client("devnet").unwrap();
    let link = get_explorer_link(ExplorerLink::Transaction("abc"), devnet.cluster());
    assert_eq!(link, "https://explorer.solana.com/tx/abc?cluster=devnet");
}
