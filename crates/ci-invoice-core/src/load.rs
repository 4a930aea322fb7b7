use ci_contract_client::{InvoiceContract, TokenLedger};
use tracing::error;

use crate::aggregate::{read_balance, refresh_invoices};
use crate::error::{InvoiceError, failure_message};
use crate::render::render_invoices;
use crate::session::Session;
use crate::view::InvoiceView;

/// Page-load sequence after a successful connect: balance, invoices, cards.
///
/// A read failure is logged and shown; there is no recovery path short of a
/// reload.
pub async fn load<C, T>(session: &Session<C, T>, view: &dyn InvoiceView) -> Result<(), InvoiceError>
where
    C: InvoiceContract,
    T: TokenLedger,
{
    let loaded = async {
        show_balance(session, view).await?;
        refresh_invoices(session).await?;
        redraw(session, view);
        Ok::<(), InvoiceError>(())
    }
    .await;

    match loaded {
        Ok(()) => {
            view.notification_off();
            Ok(())
        }
        Err(err) => {
            error!(account = %session.account(), error = %err, "initial load failed");
            view.notify(&failure_message(&err));
            Err(err)
        }
    }
}

/// Clear and refetch the collection, redraw it, then re-read the balance.
pub async fn refresh_all<C, T>(
    session: &Session<C, T>,
    view: &dyn InvoiceView,
) -> Result<(), InvoiceError>
where
    C: InvoiceContract,
    T: TokenLedger,
{
    if let Err(err) = refresh_invoices(session).await {
        // refresh_invoices left the collection empty.
        redraw(session, view);
        return Err(err);
    }
    redraw(session, view);
    show_balance(session, view).await
}

/// Render the session's current collection into the view.
pub fn redraw<C, T>(session: &Session<C, T>, view: &dyn InvoiceView) {
    let rendered = render_invoices(&session.invoices(), session.account(), session.config());
    view.show_invoices(&rendered);
}

async fn show_balance<C, T>(session: &Session<C, T>, view: &dyn InvoiceView) -> Result<(), InvoiceError>
where
    T: TokenLedger,
{
    let balance = read_balance(session).await?;
    view.show_balance(&balance.to_display(session.config().token_decimals));
    Ok(())
}
