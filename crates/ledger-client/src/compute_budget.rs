//! Compute Budget program instructions.

use crate::address::Address;
use crate::transaction::Instruction;

/// `ComputeBudget111111111111111111111111111111`
pub const COMPUTE_BUDGET_PROGRAM_ID: Address = Address::new([
    0x03, 0x06, 0x46, 0x6f, 0xe5, 0x21, 0x17, 0x32, 0xff, 0xec, 0xad, 0xba, 0x72, 0xc3, 0x9b,
    0xe7, 0xbc, 0x8c, 0xe5, 0xbb, 0xc5, 0xf7, 0x12, 0x6b, 0x2c, 0x43, 0x9b, 0x3a, 0x40, 0x00,
    0x00, 0x00,
]);

const SET_COMPUTE_UNIT_LIMIT: u8 = 2;
const SET_COMPUTE_UNIT_PRICE: u8 = 3;

/// Cap the compute units the transaction may consume.
pub fn set_compute_unit_limit(units: u32) -> Instruction {
    let mut data = Vec::with_capacity(5);
    data.push(SET_COMPUTE_UNIT_LIMIT);
    data.extend_from_slice(&units.to_le_bytes());
    Instruction {
        program_id: COMPUTE_BUDGET_PROGRAM_ID,
        accounts: vec![],
        data,
    }
}

/// Priority fee in micro-lamports per compute unit.
pub fn set_compute_unit_price(micro_lamports: u64) -> Instruction {
    let mut data = Vec::with_capacity(9);
    data.push(SET_COMPUTE_UNIT_PRICE);
    data.extend_from_slice(&micro_lamports.to_le_bytes());
    Instruction {
        program_id: COMPUTE_BUDGET_PROGRAM_ID,
        accounts: vec![],
        data,
    }
}

/// Prefix instructions for a builder: the limit always, the price only when set.
pub(crate) fn budget_instructions(limit: u32, price: Option<u64>) -> Vec<Instruction> {
    let mut out = vec![set_compute_unit_limit(limit)];
    if let Some(price) = price {
        out.push(set_compute_unit_price(price));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_id_base58() {
        assert_eq!(
            COMPUTE_BUDGET_PROGRAM_ID.to_string(),
            "ComputeBudget111111111111111111111111111111"
        );
    }

    #[test]
    fn unit_limit_encoding() {
        let ix = set_compute_unit_limit(200_000);
        assert_eq!(ix.data, vec![2, 0x40, 0x0d, 0x03, 0x00]);
        assert!(ix.accounts.is_empty());
    }

    #[test]
    fn unit_price_encoding() {
        let ix = set_compute_unit_price(1);
        assert_eq!(ix.data, vec![3, 1, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn price_is_optional() {
        assert_eq!(budget_instructions(1_000, None).len(), 1);
        assert_eq!(budget_instructions(1_000, Some(5)).len(), 2);
    }
}
