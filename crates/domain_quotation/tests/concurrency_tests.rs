//! Concurrent mutation of one quotation

use std::time::Duration;

use domain_quotation::ports::mock::InMemoryQuotationRepository;
use core_kernel::QuotationId;
use domain_quotation::{GenerateOptions, LockPolicy, QuotationError};
use test_utils::{assert_company_order, assert_ranks_contiguous, TestHarnessBuilder, TestQuotationBuilder};

#[tokio::test]
async fn test_second_generate_conflicts_while_first_persists() {
    let harness = TestHarnessBuilder::new()
        .repository(InMemoryQuotationRepository::new().with_replace_delay(Duration::from_millis(150)))
        .build();
    let quotation = harness
        .service
        .create_quotation(TestQuotationBuilder::new().build())
        .await
        .unwrap();
    let id = quotation.id();

    let first = {
        let service = harness.service.clone();
        tokio::spawn(async move { service.generate_quotes(id, GenerateOptions::default()).await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    let second = harness.service.generate_quotes(id, GenerateOptions::default()).await;

    assert!(matches!(second, Err(QuotationError::Conflict(_))));
    let first = first.await.unwrap().unwrap();
    assert_eq!(first.generated, 3);

    let stored = harness.service.company_quotes(id).await.unwrap();
    assert_ranks_contiguous(&stored);
    assert_company_order(&stored, &["B", "C", "A"]);
}

#[tokio::test]
async fn test_wait_policy_serializes_generations() {
    let harness = TestHarnessBuilder::new()
        .lock_policy(LockPolicy::Wait { timeout_ms: 2_000 })
        .repository(InMemoryQuotationRepository::new().with_replace_delay(Duration::from_millis(50)))
        .build();
    let quotation = harness
        .service
        .create_quotation(TestQuotationBuilder::new().build())
        .await
        .unwrap();
    let id = quotation.id();

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let service = harness.service.clone();
            tokio::spawn(async move { service.generate_quotes(id, GenerateOptions::default()).await })
        })
        .collect();

    for task in tasks {
        let outcome = task.await.unwrap().unwrap();
        assert_ranks_contiguous(&outcome.quotes);
    }

    assert_eq!(harness.repository.replace_calls(), 4);
    let stored = harness.service.company_quotes(id).await.unwrap();
    assert_eq!(stored.len(), 3);
    assert_ranks_contiguous(&stored);
}

#[tokio::test]
async fn test_reads_see_a_complete_set_during_replacement() {
    let harness = TestHarnessBuilder::new()
        .repository(InMemoryQuotationRepository::new().with_replace_delay(Duration::from_millis(100)))
        .build();
    let quotation = harness
        .service
        .create_quotation(TestQuotationBuilder::new().build())
        .await
        .unwrap();
    let id = quotation.id();
    harness
        .service
        .generate_quotes(id, GenerateOptions::default())
        .await
        .unwrap();

    let writer = {
        let service = harness.service.clone();
        tokio::spawn(async move { service.generate_quotes(id, GenerateOptions::default()).await })
    };
    for _ in 0..5 {
        let stored = harness.service.company_quotes(id).await.unwrap();
        assert_eq!(stored.len(), 3);
        assert_ranks_contiguous(&stored);
        tokio::time::sleep(Duration::from_millis(15)).await;
    }
    writer.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_dropped_caller_does_not_cut_persist_short() {
    let harness = TestHarnessBuilder::new()
        .repository(InMemoryQuotationRepository::new().with_replace_delay(Duration::from_millis(80)))
        .build();
    let quotation = harness
        .service
        .create_quotation(TestQuotationBuilder::new().build())
        .await
        .unwrap();
    let id = quotation.id();

    let aborted = tokio::time::timeout(
        Duration::from_millis(40),
        harness.service.generate_quotes(id, GenerateOptions::default()),
    )
    .await;
    assert!(aborted.is_err());

    tokio::time::sleep(Duration::from_millis(150)).await;
    let stored = harness.service.company_quotes(id).await.unwrap();
    assert_company_order(&stored, &["B", "C", "A"]);
    assert!(harness.service.locks().acquire(id).await.is_ok());
}

#[tokio::test]
async fn test_unknown_quotations_leave_no_lock_entries() {
    let harness = TestHarnessBuilder::new().build();

    for _ in 0..200 {
        let result = harness
            .service
            .generate_quotes(QuotationId::new(), GenerateOptions::default())
            .await;
        assert!(matches!(result, Err(QuotationError::NotFound { .. })));
    }

    assert!(harness.service.locks().is_empty());
}

#[tokio::test]
async fn test_lock_entry_is_released_after_generation() {
    let harness = TestHarnessBuilder::new().build();
    let quotation = harness
        .service
        .create_quotation(TestQuotationBuilder::new().build())
        .await
        .unwrap();

    harness
        .service
        .generate_quotes(quotation.id(), GenerateOptions::default())
        .await
        .unwrap();

    assert!(harness.service.locks().is_empty());
}

#[tokio::test]
async fn test_export_during_replacement_keeps_its_delivery_record() {
    let harness = TestHarnessBuilder::new()
        .repository(InMemoryQuotationRepository::new().with_replace_delay(Duration::from_millis(150)))
        .build();
    let quotation = harness
        .service
        .create_quotation(TestQuotationBuilder::new().build())
        .await
        .unwrap();
    let id = quotation.id();
    harness
        .service
        .generate_quotes(id, GenerateOptions::default())
        .await
        .unwrap();

    let regenerate = {
        let service = harness.service.clone();
        tokio::spawn(async move { service.generate_quotes(id, GenerateOptions::default()).await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    harness.service.export_document(id).await.unwrap();
    regenerate.await.unwrap().unwrap();

    let stored = harness.service.get(id).await.unwrap();
    assert_eq!(stored.deliveries().len(), 1);
    assert_ranks_contiguous(stored.company_quotes());
}
