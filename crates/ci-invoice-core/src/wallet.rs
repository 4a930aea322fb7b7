use async_trait::async_trait;
use ci_api_types::Address;
use ci_contract_client::{ContractResult, InvoiceContract, TokenLedger};
use tracing::{info, warn};

use crate::config::InvoiceConfig;
use crate::error::{InvoiceError, failure_message};
use crate::session::Session;
use crate::view::{APPROVE_DAPP, InvoiceView};

/// An injected wallet that can authorize this app and hand out bound clients.
#[async_trait(?Send)]
pub trait Wallet {
    type Contract: InvoiceContract;
    type Token: TokenLedger;

    /// Ask the user to authorize the app.
    async fn enable(&self) -> ContractResult<()>;
    async fn default_account(&self) -> ContractResult<Address>;
    fn invoice_contract(&self, config: &InvoiceConfig) -> ContractResult<Self::Contract>;
    fn token_ledger(&self, config: &InvoiceConfig) -> ContractResult<Self::Token>;
}

/// Authorize against `wallet` and bind a fresh session to its default account.
///
/// `None` means no wallet was injected into the page. Failures are shown on
/// the banner and returned; nothing is retried.
pub async fn connect<W: Wallet>(
    wallet: Option<&W>,
    config: InvoiceConfig,
    view: &dyn InvoiceView,
) -> Result<Session<W::Contract, W::Token>, InvoiceError> {
    let Some(wallet) = wallet else {
        let err = InvoiceError::WalletAbsent;
        view.notify(&failure_message(&err));
        return Err(err);
    };

    view.notify(APPROVE_DAPP);
    match bind(wallet, config).await {
        Ok(session) => {
            view.notification_off();
            info!(account = %session.account(), contract = %session.contract().address(), "wallet connected");
            Ok(session)
        }
        Err(err) => {
            let err = InvoiceError::WalletAuthorization(err.to_string());
            warn!(error = %err, "wallet connection failed");
            view.notify(&failure_message(&err));
            Err(err)
        }
    }
}

async fn bind<W: Wallet>(
    wallet: &W,
    config: InvoiceConfig,
) -> ContractResult<Session<W::Contract, W::Token>> {
    wallet.enable().await?;
    let account = wallet.default_account().await?;
    let contract = wallet.invoice_contract(&config)?;
    let token = wallet.token_ledger(&config)?;
    Ok(Session::new(config, account, contract, token))
}
