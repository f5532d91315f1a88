//! Asset data wire format.
//!
//! Asset data is `[4-byte type tag][payload]`. Payloads are ABI-encoded with
//! `alloy-sol-types`:
//!
//! ```text
//! fungible:      bytes32 token
//! non-fungible:  (bytes32 token, uint256 token_id)
//! composite:     (uint256[] amounts, bytes[] nested)
//! ```
//!
//! Decoding bounds-checks every offset and length against the buffer instead
//! of trusting caller-supplied positions. Amounts and token ids are carried as
//! `uint256` on the wire and must fit in 128 bits once decoded.

use alloy_primitives::{Bytes, B256, U256};
use alloy_sol_types::{sol_data, SolType};
use opensettle_types::{
    constants::{ASSET_TYPE_TAG_SIZE, WORD_SIZE},
    Address, Amount, AssetTypeId, OpensettleError, Result, TokenId,
};

type NonFungibleAbi = (sol_data::FixedBytes<32>, sol_data::Uint<256>);
type CompositeAbi = (sol_data::Array<sol_data::Uint<256>>, sol_data::Array<sol_data::Bytes>);

/// A type-tagged asset descriptor: which handler, and what it should move.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetData {
    pub asset_type: AssetTypeId,
    pub payload: Vec<u8>,
}

impl AssetData {
    #[must_use]
    pub fn new(asset_type: AssetTypeId, payload: Vec<u8>) -> Self {
        Self {
            asset_type,
            payload,
        }
    }

    /// Split raw asset data into its tag and payload.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < ASSET_TYPE_TAG_SIZE {
            return Err(malformed(format!(
                "asset data is {} bytes, shorter than the type tag",
                bytes.len()
            )));
        }
        let mut tag = [0u8; ASSET_TYPE_TAG_SIZE];
        tag.copy_from_slice(&bytes[..ASSET_TYPE_TAG_SIZE]);
        Ok(Self {
            asset_type: AssetTypeId(tag),
            payload: bytes[ASSET_TYPE_TAG_SIZE..].to_vec(),
        })
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ASSET_TYPE_TAG_SIZE + self.payload.len());
        out.extend_from_slice(&self.asset_type.0);
        out.extend_from_slice(&self.payload);
        out
    }

    /// Asset data for a fungible token.
    #[must_use]
    pub fn fungible(token: TokenId) -> Self {
        Self::new(AssetTypeId::FUNGIBLE, token.0.to_vec())
    }

    /// Asset data for one non-fungible token id.
    #[must_use]
    pub fn non_fungible(token: TokenId, token_id: u128) -> Self {
        let payload =
            NonFungibleAbi::abi_encode_params(&(B256::from(token.0), U256::from(token_id)));
        Self::new(AssetTypeId::NON_FUNGIBLE, payload)
    }
}

/// A fully described transfer: what, between whom, how much.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub asset: AssetData,
    pub from: Address,
    pub to: Address,
    pub amount: Amount,
}

/// Payload of a composite transfer: `amounts[i]` scales `sub_requests[i]`.
///
/// Fields are public so malformed bundles can be built; decoding enforces
/// `amounts.len() == sub_requests.len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositePayload {
    pub amounts: Vec<Amount>,
    pub sub_requests: Vec<AssetData>,
}

impl CompositePayload {
    pub fn new(amounts: Vec<Amount>, sub_requests: Vec<AssetData>) -> Result<Self> {
        if amounts.len() != sub_requests.len() {
            return Err(OpensettleError::LengthMismatch {
                amounts: amounts.len(),
                sub_requests: sub_requests.len(),
            });
        }
        Ok(Self {
            amounts,
            sub_requests,
        })
    }

    /// ABI-encode `(uint256[] amounts, bytes[] nested)` without the type tag.
    #[must_use]
    pub fn encode_payload(&self) -> Vec<u8> {
        let amounts: Vec<U256> = self.amounts.iter().copied().map(U256::from).collect();
        let nested: Vec<Bytes> = self
            .sub_requests
            .iter()
            .map(|sub| Bytes::from(sub.encode()))
            .collect();
        CompositeAbi::abi_encode_params(&(amounts, nested))
    }

    /// Full composite asset data, tag included.
    #[must_use]
    pub fn to_asset_data(&self) -> AssetData {
        AssetData::new(AssetTypeId::COMPOSITE, self.encode_payload())
    }

    /// Schema-driven decode of a composite payload (tag already stripped).
    pub fn decode_payload(payload: &[u8]) -> Result<Self> {
        let (amounts, nested) = CompositeAbi::abi_decode_params(payload).map_err(abi_error)?;
        if amounts.len() != nested.len() {
            return Err(OpensettleError::LengthMismatch {
                amounts: amounts.len(),
                sub_requests: nested.len(),
            });
        }
        let amounts = amounts
            .into_iter()
            .map(narrow)
            .collect::<Result<Vec<Amount>>>()?;
        let sub_requests = nested
            .iter()
            .map(|bytes| AssetData::decode(bytes))
            .collect::<Result<Vec<AssetData>>>()?;
        Ok(Self {
            amounts,
            sub_requests,
        })
    }
}

/// Decode the token of a fungible payload.
pub fn decode_fungible(payload: &[u8]) -> Result<TokenId> {
    let token: [u8; WORD_SIZE] = payload.try_into().map_err(|_| {
        malformed(format!(
            "fungible payload must be {WORD_SIZE} bytes, got {}",
            payload.len()
        ))
    })?;
    Ok(TokenId(token))
}

/// Decode `(token, token_id)` of a non-fungible payload.
pub fn decode_non_fungible(payload: &[u8]) -> Result<(TokenId, u128)> {
    if payload.len() != 2 * WORD_SIZE {
        return Err(malformed(format!(
            "non-fungible payload must be {} bytes, got {}",
            2 * WORD_SIZE,
            payload.len()
        )));
    }
    let (token, token_id) = NonFungibleAbi::abi_decode_params(payload).map_err(abi_error)?;
    Ok((TokenId(token.0), narrow(token_id)?))
}

/// A decoded `uint256` as an [`Amount`]. Values above 128 bits overflow.
fn narrow(value: U256) -> Result<Amount> {
    Amount::try_from(value).map_err(|_| OpensettleError::ArithmeticOverflow)
}

fn abi_error(err: alloy_sol_types::Error) -> OpensettleError {
    malformed(err.to_string())
}

fn malformed(reason: String) -> OpensettleError {
    OpensettleError::MalformedAssetData { reason }
}
