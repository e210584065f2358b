//! Unsigned instruction drafts against the launchpad's on-chain program.
//!
//! Everything here is a pure builder: program id, ordered account metas
//! with signer/writable flags, and an opaque payload. Nothing signs or
//! submits; an external signer turns a draft into a real transaction.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::native_token::LAMPORTS_PER_SOL;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::{system_program, sysvar};
use spl_associated_token_account::get_associated_token_address;

/// Main launchpad bonding-curve program.
pub const PUMP_PROGRAM: Pubkey =
    solana_sdk::pubkey!("6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P");

pub const PUMP_GLOBAL: Pubkey =
    solana_sdk::pubkey!("4wTV1YmiEkRvAtNtsSGPtUrqRYQMe5SKy2uB4Jjaxnjf");

pub const PUMP_FEE_RECIPIENT: Pubkey =
    solana_sdk::pubkey!("CebN5WGQ4jvEPvsVU4EoHEpgzq1VV7AbicfhtW4xC9iM");

pub const PUMP_EVENT_AUTHORITY: Pubkey =
    solana_sdk::pubkey!("Ce6TQqeHC9p8KetsN6JsjHK7UTZk7nasjjnr7Xxhp9G1");

pub const PUMP_MINT_AUTHORITY: Pubkey =
    solana_sdk::pubkey!("TSLvdd1pWpHVjahSpsvCXUbgwsL3JAcvokwaKt1eokM");

pub const MPL_TOKEN_METADATA: Pubkey =
    solana_sdk::pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");

/// 8-byte anchor discriminators for the program's instructions.
pub const CREATE_DISCRIMINATOR: [u8; 8] = [24, 30, 200, 40, 5, 28, 7, 119];
pub const BUY_DISCRIMINATOR: [u8; 8] = [102, 6, 61, 18, 1, 218, 235, 234];
pub const SELL_DISCRIMINATOR: [u8; 8] = [51, 230, 133, 164, 1, 127, 131, 173];

/// SOL reserve at which a bonding curve graduates. Distinct from the
/// 69,000 USD market-cap threshold used for listing summaries.
pub const CURVE_GRADUATION_SOL: u64 = 85;

/// Wire-serializable unsigned instruction descriptor.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructionDraft {
    pub program_id: String,
    pub accounts: Vec<DraftAccount>,
    /// Base64-encoded instruction payload.
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftAccount {
    pub pubkey: String,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl From<&Instruction> for InstructionDraft {
    fn from(ix: &Instruction) -> Self {
        Self {
            program_id: ix.program_id.to_string(),
            accounts: ix
                .accounts
                .iter()
                .map(|meta| DraftAccount {
                    pubkey: meta.pubkey.to_string(),
                    is_signer: meta.is_signer,
                    is_writable: meta.is_writable,
                })
                .collect(),
            data: BASE64.encode(&ix.data),
        }
    }
}

/// Bonding-curve PDA for a mint.
pub fn bonding_curve_address(mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[b"bonding-curve", mint.as_ref()], &PUMP_PROGRAM).0
}

fn metadata_address(mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[b"metadata", MPL_TOKEN_METADATA.as_ref(), mint.as_ref()],
        &MPL_TOKEN_METADATA,
    )
    .0
}

fn encode_string(buf: &mut Vec<u8>, value: &str) {
    buf.extend_from_slice(&(value.len() as u32).to_le_bytes());
    buf.extend_from_slice(value.as_bytes());
}

/// Unsigned `create` instruction: mints a new token onto its bonding curve.
pub fn build_create_instruction(
    creator: &Pubkey,
    mint: &Pubkey,
    name: &str,
    symbol: &str,
    metadata_uri: &str,
) -> Instruction {
    let bonding_curve = bonding_curve_address(mint);
    let associated_bonding_curve = get_associated_token_address(&bonding_curve, mint);

    let mut data = CREATE_DISCRIMINATOR.to_vec();
    encode_string(&mut data, name);
    encode_string(&mut data, symbol);
    encode_string(&mut data, metadata_uri);
    data.extend_from_slice(creator.as_ref());

    Instruction {
        program_id: PUMP_PROGRAM,
        accounts: vec![
            AccountMeta::new(*mint, true),
            AccountMeta::new_readonly(PUMP_MINT_AUTHORITY, false),
            AccountMeta::new(bonding_curve, false),
            AccountMeta::new(associated_bonding_curve, false),
            AccountMeta::new_readonly(PUMP_GLOBAL, false),
            AccountMeta::new_readonly(MPL_TOKEN_METADATA, false),
            AccountMeta::new(metadata_address(mint), false),
            AccountMeta::new(*creator, true),
            AccountMeta::new_readonly(system_program::ID, false),
            AccountMeta::new_readonly(spl_token::ID, false),
            AccountMeta::new_readonly(spl_associated_token_account::ID, false),
            AccountMeta::new_readonly(sysvar::rent::ID, false),
            AccountMeta::new_readonly(PUMP_EVENT_AUTHORITY, false),
            AccountMeta::new_readonly(PUMP_PROGRAM, false),
        ],
        data,
    }
}

/// Unsigned `buy`: `token_amount` base units for at most `max_sol_cost`
/// lamports.
pub fn build_buy_instruction(
    buyer: &Pubkey,
    mint: &Pubkey,
    token_amount: u64,
    max_sol_cost: u64,
) -> Instruction {
    let bonding_curve = bonding_curve_address(mint);
    let associated_bonding_curve = get_associated_token_address(&bonding_curve, mint);
    let buyer_token_account = get_associated_token_address(buyer, mint);

    let mut data = BUY_DISCRIMINATOR.to_vec();
    data.extend_from_slice(&token_amount.to_le_bytes());
    data.extend_from_slice(&max_sol_cost.to_le_bytes());

    Instruction {
        program_id: PUMP_PROGRAM,
        accounts: vec![
            AccountMeta::new_readonly(PUMP_GLOBAL, false),
            AccountMeta::new(PUMP_FEE_RECIPIENT, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new(bonding_curve, false),
            AccountMeta::new(associated_bonding_curve, false),
            AccountMeta::new(buyer_token_account, false),
            AccountMeta::new(*buyer, true),
            AccountMeta::new_readonly(system_program::ID, false),
            AccountMeta::new_readonly(spl_token::ID, false),
            AccountMeta::new_readonly(sysvar::rent::ID, false),
            AccountMeta::new_readonly(PUMP_EVENT_AUTHORITY, false),
            AccountMeta::new_readonly(PUMP_PROGRAM, false),
        ],
        data,
    }
}

/// Unsigned `sell`: `token_amount` base units for at least
/// `min_sol_output` lamports.
pub fn build_sell_instruction(
    seller: &Pubkey,
    mint: &Pubkey,
    token_amount: u64,
    min_sol_output: u64,
) -> Instruction {
    let bonding_curve = bonding_curve_address(mint);
    let associated_bonding_curve = get_associated_token_address(&bonding_curve, mint);
    let seller_token_account = get_associated_token_address(seller, mint);

    let mut data = SELL_DISCRIMINATOR.to_vec();
    data.extend_from_slice(&token_amount.to_le_bytes());
    data.extend_from_slice(&min_sol_output.to_le_bytes());

    Instruction {
        program_id: PUMP_PROGRAM,
        accounts: vec![
            AccountMeta::new_readonly(PUMP_GLOBAL, false),
            AccountMeta::new(PUMP_FEE_RECIPIENT, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new(bonding_curve, false),
            AccountMeta::new(associated_bonding_curve, false),
            AccountMeta::new(seller_token_account, false),
            AccountMeta::new(*seller, true),
            AccountMeta::new_readonly(system_program::ID, false),
            AccountMeta::new_readonly(spl_associated_token_account::ID, false),
            AccountMeta::new_readonly(spl_token::ID, false),
            AccountMeta::new_readonly(PUMP_EVENT_AUTHORITY, false),
            AccountMeta::new_readonly(PUMP_PROGRAM, false),
        ],
        data,
    }
}

/// Estimate graduation progress from a bonding-curve account's lamport
/// balance against the 85-SOL reserve threshold.
pub fn graduation_progress(curve_lamports: u64) -> f64 {
    let threshold = (CURVE_GRADUATION_SOL * LAMPORTS_PER_SOL) as f64;
    (curve_lamports as f64 / threshold * 100.0).min(100.0)
}
