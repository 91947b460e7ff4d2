//! Integration tests for invoicing and payment reconciliation.

use std::sync::Arc;

use common::{Identity, InvoiceId, Money};
use domain::{
    DomainError, ErrorKind, InMemoryNotifier, InMemoryStorage, InvoiceCreateForm, InvoiceService,
    InvoiceUpdateForm, RequestContext, TransactionForm, TransactionPublic, TransactionService,
    TransitionPolicy, UpdateTransactionForm,
};
use store::{InMemoryStore, InvoiceRepository, InvoiceStatus, TransactionRepository, TransactionStatus};

/// base64 of "receipt"
const PNG_RECEIPT: &str = "data:image/png;base64,cmVjZWlwdA==";

struct Fixture {
    store: InMemoryStore,
    storage: InMemoryStorage,
    transactions: TransactionService<InMemoryStore>,
    invoices: InvoiceService<InMemoryStore>,
    buyer: Identity,
    seller: Identity,
}

async fn fixture() -> Fixture {
    let store = InMemoryStore::new();
    let storage = InMemoryStorage::new();

    let buyer = store.seed_user("Budi").await;
    let seller = store.seed_user("Sari").await;

    Fixture {
        transactions: TransactionService::new(store.clone(), Arc::new(InMemoryNotifier::new())),
        invoices: InvoiceService::new(store.clone(), Arc::new(storage.clone())),
        store,
        storage,
        buyer: Identity::new(buyer.id).unwrap(),
        seller: Identity::new(seller.id).unwrap(),
    }
}

/// Places a transaction for 3 x Rp5000.
async fn placed(f: &Fixture) -> TransactionPublic {
    let country = f.store.seed_country("Japan").await;
    let product = f
        .store
        .seed_product(f.seller.user_id(), country.id, "Matcha", Money::new(5000))
        .await;
    let address = f.store.seed_address(f.buyer.user_id()).await;

    f.transactions
        .create_transaction(
            &RequestContext::new(),
            f.buyer,
            TransactionForm {
                product_id: product.id.as_i64(),
                quantity: 3,
                address_id: address.id.as_i64(),
                notes: String::new(),
            },
        )
        .await
        .unwrap()
}

fn create_form(tx: &TransactionPublic) -> InvoiceCreateForm {
    InvoiceCreateForm {
        transaction_id: tx.id.as_i64(),
        payment_method: "bank_transfer".to_string(),
    }
}

fn paid() -> InvoiceUpdateForm {
    InvoiceUpdateForm {
        receipt_proof: None,
        status: Some("paid".to_string()),
    }
}

mod issue {
    use super::*;

    #[tokio::test]
    async fn invoice_links_back_to_transaction() {
        let f = fixture().await;
        let ctx = RequestContext::new();
        let tx = placed(&f).await;

        let invoice = f
            .invoices
            .insert_invoice(&ctx, f.buyer, create_form(&tx))
            .await
            .unwrap();

        assert_eq!(invoice.transaction_id, tx.id);
        assert_eq!(invoice.coded_price, Money::new(15_000));
        assert_eq!(invoice.status, "pending");
        assert_eq!(invoice.receipt_proof, "");
        assert!(invoice.paid_at.is_none());

        let public = f.transactions.get_transaction(&ctx, tx.id).await.unwrap();
        assert_eq!(public.invoice_id, Some(invoice.id));
        assert_eq!(public.status, "placed");
    }

    #[tokio::test]
    async fn second_invoice_is_rejected() {
        let f = fixture().await;
        let ctx = RequestContext::new();
        let tx = placed(&f).await;
        f.invoices
            .insert_invoice(&ctx, f.buyer, create_form(&tx))
            .await
            .unwrap();

        let err = f
            .invoices
            .insert_invoice(&ctx, f.buyer, create_form(&tx))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::TransactionInvoiceExists));
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(f.store.invoice_count().await, 1);
    }

    #[tokio::test]
    async fn seller_cannot_issue_invoice() {
        let f = fixture().await;
        let tx = placed(&f).await;

        let err = f
            .invoices
            .insert_invoice(&RequestContext::new(), f.seller, create_form(&tx))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::EditInvoiceForbidden));
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert_eq!(f.store.invoice_count().await, 0);
    }

    #[tokio::test]
    async fn missing_transaction_is_not_found() {
        let f = fixture().await;

        let err = f
            .invoices
            .insert_invoice(
                &RequestContext::new(),
                f.buyer,
                InvoiceCreateForm {
                    transaction_id: 9999,
                    payment_method: "bank_transfer".to_string(),
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn missing_invoice_is_not_found() {
        let f = fixture().await;

        let err = f
            .invoices
            .get_invoice(&RequestContext::new(), InvoiceId::new(42))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.code(), "not_found");
    }
}

mod payment {
    use super::*;

    #[tokio::test]
    async fn paid_settles_invoice_and_transaction_together() {
        let f = fixture().await;
        let ctx = RequestContext::new();
        let tx = placed(&f).await;
        let invoice = f
            .invoices
            .insert_invoice(&ctx, f.buyer, create_form(&tx))
            .await
            .unwrap();

        let updated = f
            .invoices
            .update_invoice(&ctx, f.buyer, invoice.id, paid())
            .await
            .unwrap();

        assert_eq!(updated.status, "paid");
        let stored_invoice = f.store.get_invoice(invoice.id).await.unwrap();
        let stored_tx = f.store.get_transaction(tx.id).await.unwrap();
        assert_eq!(stored_invoice.status, InvoiceStatus::Paid);
        assert_eq!(stored_tx.status, TransactionStatus::Paid);
        assert!(stored_invoice.paid_at.is_some());
        assert_eq!(stored_invoice.paid_at, stored_tx.paid_at);
    }

    #[tokio::test]
    async fn other_status_values_are_ignored() {
        let f = fixture().await;
        let ctx = RequestContext::new();
        let tx = placed(&f).await;
        let invoice = f
            .invoices
            .insert_invoice(&ctx, f.buyer, create_form(&tx))
            .await
            .unwrap();

        let updated = f
            .invoices
            .update_invoice(
                &ctx,
                f.buyer,
                invoice.id,
                InvoiceUpdateForm {
                    receipt_proof: None,
                    status: Some("PAID".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.status, "pending");
        let stored_tx = f.store.get_transaction(tx.id).await.unwrap();
        assert_eq!(stored_tx.status, TransactionStatus::Placed);
    }

    #[tokio::test]
    async fn receipt_is_stored_under_lowercased_code() {
        let f = fixture().await;
        let ctx = RequestContext::new();
        let tx = placed(&f).await;
        let invoice = f
            .invoices
            .insert_invoice(&ctx, f.buyer, create_form(&tx))
            .await
            .unwrap();

        let updated = f
            .invoices
            .update_invoice(
                &ctx,
                f.buyer,
                invoice.id,
                InvoiceUpdateForm {
                    receipt_proof: Some(PNG_RECEIPT.to_string()),
                    status: None,
                },
            )
            .await
            .unwrap();

        let path = format!(
            "invoice_proofs/{}.png",
            invoice.invoice_code.as_str().to_lowercase()
        );
        assert_eq!(f.storage.file(&path).await, Some(b"receipt".to_vec()));
        assert_eq!(updated.receipt_proof, format!("memory://{path}"));
        assert_eq!(updated.status, "pending");
    }

    #[tokio::test]
    async fn receipt_and_payment_in_one_request() {
        let f = fixture().await;
        let ctx = RequestContext::new();
        let tx = placed(&f).await;
        let invoice = f
            .invoices
            .insert_invoice(&ctx, f.buyer, create_form(&tx))
            .await
            .unwrap();

        let updated = f
            .invoices
            .update_invoice(
                &ctx,
                f.buyer,
                invoice.id,
                InvoiceUpdateForm {
                    receipt_proof: Some(PNG_RECEIPT.to_string()),
                    status: Some("paid".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.status, "paid");
        assert!(updated.receipt_proof.starts_with("memory://invoice_proofs/jstp"));
        assert_eq!(f.storage.file_count().await, 1);
    }

    #[tokio::test]
    async fn empty_receipt_is_skipped() {
        let f = fixture().await;
        let ctx = RequestContext::new();
        let tx = placed(&f).await;
        let invoice = f
            .invoices
            .insert_invoice(&ctx, f.buyer, create_form(&tx))
            .await
            .unwrap();

        f.invoices
            .update_invoice(
                &ctx,
                f.buyer,
                invoice.id,
                InvoiceUpdateForm {
                    receipt_proof: Some(String::new()),
                    status: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(f.storage.file_count().await, 0);
    }

    #[tokio::test]
    async fn seller_cannot_confirm_payment() {
        let f = fixture().await;
        let ctx = RequestContext::new();
        let tx = placed(&f).await;
        let invoice = f
            .invoices
            .insert_invoice(&ctx, f.buyer, create_form(&tx))
            .await
            .unwrap();

        let err = f
            .invoices
            .update_invoice(&ctx, f.seller, invoice.id, paid())
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::EditInvoiceForbidden));
        let stored = f.store.get_invoice(invoice.id).await.unwrap();
        assert_eq!(stored.status, InvoiceStatus::Pending);
    }

    #[tokio::test]
    async fn strict_policy_keeps_finished_transaction_final() {
        let f = fixture().await;
        let ctx = RequestContext::new();
        let tx = placed(&f).await;
        let invoice = f
            .invoices
            .insert_invoice(&ctx, f.buyer, create_form(&tx))
            .await
            .unwrap();
        f.transactions
            .update_transaction(&ctx, f.seller, tx.id, UpdateTransactionForm::status("finished"))
            .await
            .unwrap();

        let strict = InvoiceService::new(f.store.clone(), Arc::new(f.storage.clone()))
            .with_policy(TransitionPolicy::Strict);
        let err = strict
            .update_invoice(&ctx, f.buyer, invoice.id, paid())
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::InvalidTransactionStateTransition));
        let stored_tx = f.store.get_transaction(tx.id).await.unwrap();
        let stored_invoice = f.store.get_invoice(invoice.id).await.unwrap();
        assert_eq!(stored_tx.status, TransactionStatus::Finished);
        assert_eq!(stored_invoice.status, InvoiceStatus::Pending);
    }

    #[tokio::test]
    async fn strict_policy_settles_placed_transaction() {
        let f = fixture().await;
        let ctx = RequestContext::new();
        let tx = placed(&f).await;
        let invoice = f
            .invoices
            .insert_invoice(&ctx, f.buyer, create_form(&tx))
            .await
            .unwrap();

        let strict = InvoiceService::new(f.store.clone(), Arc::new(f.storage.clone()))
            .with_policy(TransitionPolicy::Strict);
        strict
            .update_invoice(&ctx, f.buyer, invoice.id, paid())
            .await
            .unwrap();

        let stored_tx = f.store.get_transaction(tx.id).await.unwrap();
        assert_eq!(stored_tx.status, TransactionStatus::Paid);
    }
}
