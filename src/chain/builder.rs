use std::{str::FromStr, time::Duration};

use alloy::{
    network::EthereumWallet,
    providers::{DynProvider, Provider, ProviderBuilder, WsConnect},
    signers::local::PrivateKeySigner,
};
use tracing::info;

use crate::errors::InitError;

use super::AlloyChain;

/// Interval between receipt polls while waiting for confirmation
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Build a wallet-enabled provider for an HTTP(S) or WebSocket endpoint
pub async fn get_wallet_provider(
    rpc_url: &str,
    signer: PrivateKeySigner,
) -> Result<DynProvider, InitError> {
    let wallet = EthereumWallet::from(signer);
    let provider = if rpc_url.starts_with("http") {
        let url = rpc_url
            .parse()
            .map_err(|_| InitError::InvalidRpcUrl(format!("Failed to parse RPC URL {}", rpc_url)))?;
        ProviderBuilder::new().wallet(wallet).connect_http(url).erased()
    } else if rpc_url.starts_with("ws") {
        let ws_connect = WsConnect::new(rpc_url);
        ProviderBuilder::new()
            .wallet(wallet)
            .connect_ws(ws_connect)
            .await
            .map_err(|e| InitError::ProviderUnavailable(format!("Failed to connect to WebSocket: {}", e)))?
            .erased()
    } else {
        return Err(InitError::InvalidRpcUrl(format!(
            "unsupported scheme in {}, expected http(s) or ws(s)",
            rpc_url
        )));
    };
    Ok(provider)
}

/// Connect a signing session to the chain
///
/// Loads the signer, builds the provider and checks that the endpoint
/// answers before returning.
///
/// # Example
/// ```no_run
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// use token_splitter::chain::connect;
/// let chain = connect("https://mainnet.base.org", "0x<private key>").await?;
/// # Ok(())
/// # }
/// ```
pub async fn connect(rpc_url: &str, private_key: &str) -> Result<AlloyChain, InitError> {
    let signer = PrivateKeySigner::from_str(private_key.trim())
        .map_err(|e| InitError::InvalidSigner(e.to_string()))?;
    let account = signer.address();
    let provider = get_wallet_provider(rpc_url, signer).await?;

    let chain_id = provider.get_chain_id().await.map_err(|e| {
        if e.is_transport_error() {
            InitError::ProviderUnavailable(format!("{} is unreachable: {}", rpc_url, e))
        } else {
            InitError::ChainId(e.to_string())
        }
    })?;

    info!(%account, chain_id, "Connected wallet session");
    Ok(AlloyChain::new(provider, account, chain_id))
}
