//! Fungible token leaf handler.

use opensettle_types::{Address, Amount, AssetTypeId, Result};

use crate::codec::decode_fungible;
use crate::handler::{AssetHandler, TransferContext};

/// Moves balances of a fungible token. Payload: one word naming the token.
#[derive(Debug, Clone, Copy, Default)]
pub struct FungibleTokenHandler;

impl AssetHandler for FungibleTokenHandler {
    fn asset_type(&self) -> AssetTypeId {
        AssetTypeId::FUNGIBLE
    }

    fn transfer(
        &self,
        ctx: &mut TransferContext<'_>,
        payload: &[u8],
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        let token = decode_fungible(payload)?;
        ctx.holdings().transfer_fungible(token, from, to, amount)
    }
}
