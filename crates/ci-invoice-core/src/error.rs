use ci_api_types::AmountError;
use ci_contract_client::ContractError;
use thiserror::Error;

/// Everything that can stop a front-end flow.
///
/// Wallet and contract failures carry the raw text the wallet produced; the
/// UI shows it verbatim through [`failure_message`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvoiceError {
    #[error("Please install the CeloExtensionWallet")]
    WalletAbsent,
    #[error("{0}")]
    WalletAuthorization(String),
    #[error("{0}")]
    Read(ContractError),
    #[error("{0}")]
    Write(ContractError),
    #[error("{0}")]
    InvalidForm(String),
    #[error(transparent)]
    Amount(#[from] AmountError),
    #[error("invoice #{0} is not in the current list")]
    UnknownInvoice(usize),
    #[error("only the payer can pay this invoice")]
    NotPayer,
    #[error("invoice is already paid")]
    AlreadyPaid,
    #[error("a payment for this invoice is already in progress")]
    PaymentInProgress,
}

/// Banner text for a failed flow.
pub fn failure_message(err: &InvoiceError) -> String {
    format!("⚠️ {err}.")
}
