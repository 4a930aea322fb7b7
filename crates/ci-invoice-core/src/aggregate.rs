//! Invoice aggregation: count, fetch every index, normalize, merge.

use ci_api_types::{Address, Invoice, InvoiceRole, TokenAmount};
use ci_contract_client::{ContractError, InvoiceContract, TokenLedger};
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info};

use crate::error::InvoiceError;
use crate::session::{InvoiceCollection, Session};

/// Read every invoice the account holds in `role`.
///
/// At most `concurrency` reads are in flight; results come back in index
/// order. The first failing read rejects the whole batch.
pub async fn fetch_role<C>(
    contract: &C,
    account: &Address,
    role: InvoiceRole,
    concurrency: usize,
) -> Result<Vec<Invoice>, InvoiceError>
where
    C: InvoiceContract + ?Sized,
{
    let count = match role {
        InvoiceRole::Owned => contract.owned_invoice_count(account).await,
        InvoiceRole::Received => contract.received_invoice_count(account).await,
    }
    .map_err(InvoiceError::Read)?;

    debug!(%account, role = role.as_str(), count, "fetching invoices");

    stream::iter(0..count)
        .map(|index| fetch_one(contract, account, role, index))
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}

async fn fetch_one<C>(
    contract: &C,
    account: &Address,
    role: InvoiceRole,
    index: u64,
) -> Result<Invoice, InvoiceError>
where
    C: InvoiceContract + ?Sized,
{
    match role {
        InvoiceRole::Owned => {
            let record = contract
                .owned_invoice(account, index)
                .await
                .map_err(InvoiceError::Read)?;
            Invoice::from_owned(index, record, account).map_err(|err| decode("getOwnedInvoices", err))
        }
        InvoiceRole::Received => {
            let record = contract
                .received_invoice(account, index)
                .await
                .map_err(InvoiceError::Read)?;
            Invoice::from_received(index, record).map_err(|err| decode("getReceivedInvoice", err))
        }
    }
}

fn decode(method: &'static str, err: impl std::fmt::Display) -> InvoiceError {
    InvoiceError::Read(ContractError::Decode {
        method,
        reason: err.to_string(),
    })
}

/// Owned batch, then received batch, merged without deduplication.
pub async fn fetch_collection<C>(
    contract: &C,
    account: &Address,
    concurrency: usize,
) -> Result<InvoiceCollection, InvoiceError>
where
    C: InvoiceContract + ?Sized,
{
    let mut collection = InvoiceCollection::new();
    collection.append_batch(fetch_role(contract, account, InvoiceRole::Owned, concurrency).await?);
    collection.append_batch(
        fetch_role(contract, account, InvoiceRole::Received, concurrency).await?,
    );
    Ok(collection)
}

/// Clear and refetch the session's collection.
///
/// The new collection is swapped in only once both batches are complete; on
/// failure the session is left empty.
pub async fn refresh_invoices<C, T>(session: &Session<C, T>) -> Result<(), InvoiceError>
where
    C: InvoiceContract,
{
    let fetched = fetch_collection(
        session.contract(),
        session.account(),
        session.config().fetch_concurrency,
    )
    .await;

    match fetched {
        Ok(collection) => {
            info!(account = %session.account(), invoices = collection.len(), "invoices refreshed");
            session.replace_invoices(collection);
            Ok(())
        }
        Err(err) => {
            session.clear_invoices();
            Err(err)
        }
    }
}

/// Read the account's stable-token balance and remember it on the session.
pub async fn read_balance<C, T>(session: &Session<C, T>) -> Result<TokenAmount, InvoiceError>
where
    T: TokenLedger,
{
    let balance = session
        .token()
        .balance_of(session.account())
        .await
        .map_err(InvoiceError::Read)?;
    debug!(account = %session.account(), %balance, symbol = session.token().symbol(), "balance read");
    session.set_balance(balance);
    Ok(balance)
}
