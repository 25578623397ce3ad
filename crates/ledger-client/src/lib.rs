//! Minimal Solana client for the SPL token lifecycle.
//!
//! Covers what a script needs to create a token with Metaplex metadata,
//! mint it, and transfer it: cluster selection, keypairs, instruction
//! encoders, transaction compilation and signing, JSON-RPC, and
//! send-and-confirm. Transactions use the legacy wire format, built by hand
//! on top of `ed25519-dalek` and `bs58` instead of `solana-sdk`.

pub mod address;
pub mod amount;
pub mod builders;
pub mod client;
pub mod cluster;
pub mod compute_budget;
pub mod error;
pub mod explorer;
pub mod keypair;
pub mod memory;
pub mod rpc;
pub mod signing;
pub mod spl_token;
pub mod system_program;
pub mod token_metadata;
pub mod transaction;

pub use address::{address, find_program_address, Address};
pub use builders::{
    build_create_token_transaction, build_mint_tokens_transaction,
    build_transfer_tokens_transaction, CreateTokenParams, MintTokensParams, TransferTokensParams,
};
pub use client::{create_solana_client, ConfirmOptions, SolanaClient};
pub use cluster::Cluster;
pub use error::LedgerError;
pub use explorer::{get_explorer_link, ExplorerLink};
pub use keypair::KeyPairSigner;
pub use memory::MemoryLedger;
pub use rpc::{
    Commitment, LatestBlockhash, LedgerRpc, RpcClient, SendOptions, SignatureStatus, TokenAmount,
};
pub use signing::{
    get_signature_from_transaction, sign_transaction_message_with_signers, SignedTransaction,
};
pub use spl_token::{
    derive_associated_token_address, ASSOCIATED_TOKEN_PROGRAM_ID, TOKEN_2022_PROGRAM_ID,
    TOKEN_PROGRAM_ID,
};
pub use token_metadata::TokenMetadata;
pub use transaction::{AccountMeta, Instruction, TransactionMessage};
