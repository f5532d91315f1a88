//! Non-fungible token leaf handler.

use opensettle_types::{Address, Amount, AssetTypeId, OpensettleError, Result};

use crate::codec::decode_non_fungible;
use crate::handler::{AssetHandler, TransferContext};

/// Moves one unique token id. Payload: token word, token id word.
///
/// The amount must be exactly 1; a composite that scales a non-fungible leg
/// past 1 fails here.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonFungibleTokenHandler;

impl AssetHandler for NonFungibleTokenHandler {
    fn asset_type(&self) -> AssetTypeId {
        AssetTypeId::NON_FUNGIBLE
    }

    fn transfer(
        &self,
        ctx: &mut TransferContext<'_>,
        payload: &[u8],
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        let (token, token_id) = decode_non_fungible(payload)?;
        if amount != 1 {
            return Err(OpensettleError::InvalidAmount {
                reason: format!("non-fungible transfer amount must be 1, got {amount}"),
            });
        }
        ctx.holdings()
            .transfer_non_fungible(token, token_id, from, to)
    }
}
