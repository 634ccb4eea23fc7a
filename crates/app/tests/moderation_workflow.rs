mod common;

use chrono::{Duration, Utc};
use proptest::prelude::*;

use common::{Site, draft, jpeg, user};
use tastemark_app::{ApprovalOutcome, ErrorCategory};
use tastemark_auth::{AuthzError, Caller};
use tastemark_catalog::{EditOutcome, Product, ProductEdit, Recipe, RecipeDraft};
use tastemark_core::{Audience, Moderated};
use tastemark_infra::{DocumentStore, DocumentStoreExt, SweepReport, TastemarkConfig};

#[test]
fn submissions_stay_hidden_until_approved() {
    let site = Site::new();
    let alice = user("alice@site.io");

    let id = site.catalog.submit_product(&alice, &draft("Gochujang", "sauces"), vec![jpeg()]).unwrap();

    assert!(site.catalog.list_products(&Caller::Anonymous, Audience::Public).unwrap().is_empty());
    assert!(site.catalog.get_product(&alice, &id).unwrap().is_none());
    assert!(site.catalog.list_products_in_category("sauces").unwrap().is_empty());

    let queue = site.catalog.list_products(&site.admin, Audience::Moderators).unwrap();
    assert_eq!(queue.len(), 1);
    assert!(site.catalog.get_product(&site.admin, &id).unwrap().is_some());

    assert_eq!(
        site.catalog.gate().approve::<Product>(&site.admin, &id).unwrap(),
        ApprovalOutcome::Approved
    );

    let public = site.catalog.list_products(&Caller::Anonymous, Audience::Public).unwrap();
    assert_eq!(public.len(), 1);
    assert!(public[0].approved);
    assert_eq!(site.catalog.list_products_in_category("sauces").unwrap().len(), 1);
    assert!(site.catalog.list_products(&site.admin, Audience::Moderators).unwrap().is_empty());
}

#[test]
fn approving_twice_writes_nothing_the_second_time() {
    let site = Site::new();
    let id = site.approved_product("Miso", "pastes");
    let feed = site.store().subscribe();

    assert_eq!(
        site.catalog.gate().approve::<Product>(&site.admin, &id).unwrap(),
        ApprovalOutcome::AlreadyApproved
    );
    assert!(feed.drain().is_empty());
}

#[test]
fn only_admins_moderate() {
    let site = Site::new();
    let alice = user("alice@site.io");
    let id = site.catalog.submit_product(&alice, &draft("Tahini", "pastes"), vec![]).unwrap();

    let err = site.catalog.gate().approve::<Product>(&alice, &id).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Denied);

    let err = site.catalog.gate().reject::<Product>(&Caller::Anonymous, &id).unwrap_err();
    assert!(matches!(err, tastemark_app::AppError::Authz(AuthzError::Unauthenticated)));

    assert!(site.catalog.list_products(&alice, Audience::Moderators).unwrap_err().is_denied());
    assert!(site.catalog.pending_edits(&alice).unwrap_err().is_denied());

    let stored = site.store().count("products");
    assert_eq!(stored, 1);
    assert!(site.catalog.get_product(&site.admin, &id).unwrap().is_some_and(|p| !p.approved));
}

#[test]
fn anonymous_callers_cannot_submit() {
    let site = Site::new();
    let err = site
        .catalog
        .submit_product(&Caller::Anonymous, &draft("Harissa", "sauces"), vec![jpeg()])
        .unwrap_err();
    assert!(err.is_denied());
    assert!(site.objects().is_empty());
}

#[test]
fn admin_lookup_failure_fails_closed() {
    let site = Site::new();
    let id = site.catalog.submit_product(&user("a@site.io"), &draft("Ponzu", "sauces"), vec![]).unwrap();

    site.store().fail_reads(true);
    let err = site.catalog.gate().approve::<Product>(&site.admin, &id).unwrap_err();
    assert!(err.is_denied());
    site.store().fail_reads(false);

    assert!(site.catalog.list_products(&Caller::Anonymous, Audience::Public).unwrap().is_empty());
}

#[test]
fn rejection_removes_metadata_and_images() {
    let site = Site::new();
    let id = site
        .catalog
        .submit_product(&user("a@site.io"), &draft("Fish sauce", "sauces"), vec![jpeg(), jpeg()])
        .unwrap();
    assert_eq!(site.objects().len(), 2);

    let report = site.catalog.gate().reject::<Product>(&site.admin, &id).unwrap();
    assert_eq!(report.blobs_deleted, 2);
    assert!(report.is_clean());
    assert_eq!(site.store().count("products"), 0);
    assert!(site.objects().is_empty());

    let err = site.catalog.gate().reject::<Product>(&site.admin, &id).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn approved_content_cannot_be_rejected() {
    let site = Site::new();
    let id = site.approved_product("Sambal", "sauces");

    let err = site.catalog.gate().reject::<Product>(&site.admin, &id).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Conflict);
    assert!(site.catalog.get_product(&Caller::Anonymous, &id).unwrap().is_some());
}

#[test]
fn failed_blob_delete_is_reported_and_swept_later() {
    let site = Site::with_config(TastemarkConfig {
        bootstrap_admins: vec![tastemark_core::Email::parse(common::ADMIN_EMAIL).unwrap()],
        blob_gc_grace_secs: 0,
        ..TastemarkConfig::default()
    });
    let id = site
        .catalog
        .submit_product(&user("a@site.io"), &draft("Yuzu kosho", "pastes"), vec![jpeg()])
        .unwrap();

    site.objects().fail_deletes(true);
    let report = site.catalog.gate().reject::<Product>(&site.admin, &id).unwrap();
    assert_eq!(report.blobs_deleted, 0);
    assert_eq!(report.blobs_orphaned.len(), 1);
    assert_eq!(site.store().count("products"), 0);
    assert_eq!(site.objects().len(), 1);

    site.objects().fail_deletes(false);
    let swept = site.backend.sweeper(&site.config).sweep(Utc::now() + Duration::seconds(1)).unwrap();
    assert_eq!(
        swept,
        SweepReport { scanned: 1, referenced: 0, skipped_recent: 0, deleted: 1, failed: 0 }
    );
    assert!(site.objects().is_empty());
}

#[test]
fn applying_an_edit_updates_product_and_edit_together() {
    let site = Site::new();
    let id = site.approved_product("Chili crisp", "condiments");
    let original = site.catalog.get_product(&Caller::Anonymous, &id).unwrap().unwrap();
    let kept = original.images()[0].key.clone();

    let bob = user("bob@site.io");
    let edit_id = site
        .catalog
        .propose_edit(&bob, &id, &draft("Chili crisp (extra crunchy)", "condiments"), &[kept.clone()], vec![jpeg()])
        .unwrap();

    // Pending edits never leak into the public product.
    let unchanged = site.catalog.get_product(&Caller::Anonymous, &id).unwrap().unwrap();
    assert_eq!(unchanged.name(), "Chili crisp");
    assert_eq!(site.catalog.pending_edits(&site.admin).unwrap().len(), 1);

    assert_eq!(
        site.catalog.gate().apply_edit(&site.admin, &edit_id).unwrap(),
        EditOutcome::Applied
    );
    let updated = site.catalog.get_product(&Caller::Anonymous, &id).unwrap().unwrap();
    assert_eq!(updated.name(), "Chili crisp (extra crunchy)");
    assert_eq!(updated.images().len(), 2);
    assert_eq!(updated.images()[0].key, kept);
    assert!(updated.updated_at.is_some());
    assert!(site.catalog.pending_edits(&site.admin).unwrap().is_empty());

    let edit = site.store().fetch::<ProductEdit>(&edit_id).unwrap().unwrap();
    assert!(edit.approved);
    assert_eq!(edit.details, updated.details);

    assert_eq!(
        site.catalog.gate().apply_edit(&site.admin, &edit_id).unwrap(),
        EditOutcome::AlreadyApplied
    );
}

#[test]
fn failed_edit_commit_changes_neither_document() {
    let site = Site::new();
    let id = site.approved_product("Black garlic", "ferments");
    let edit_id = site
        .catalog
        .propose_edit(&user("bob@site.io"), &id, &draft("Aged black garlic", "ferments"), &[], vec![])
        .unwrap();

    site.store().fail_next_commit();
    let err = site.catalog.gate().apply_edit(&site.admin, &edit_id).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Backend);

    let product = site.catalog.get_product(&Caller::Anonymous, &id).unwrap().unwrap();
    assert_eq!(product.name(), "Black garlic");
    let edits = site.catalog.pending_edits(&site.admin).unwrap();
    assert_eq!(edits.len(), 1);
    assert!(edits[0].is_pending());
}

#[test]
fn rejecting_an_edit_keeps_images_the_product_still_uses() {
    let site = Site::new();
    let id = site.approved_product("Doenjang", "pastes");
    let kept = site.catalog.get_product(&Caller::Anonymous, &id).unwrap().unwrap().images()[0].key.clone();

    let edit_id = site
        .catalog
        .propose_edit(&user("bob@site.io"), &id, &draft("Doenjang", "pastes"), &[kept.clone()], vec![jpeg()])
        .unwrap();
    assert_eq!(site.objects().len(), 2);

    let report = site.catalog.gate().reject_edit(&site.admin, &edit_id).unwrap();
    assert_eq!(report.blobs_deleted, 1);
    assert!(site.objects().contains(&kept));
    assert_eq!(site.store().count(<ProductEdit as tastemark_core::Document>::COLLECTION), 0);
}

#[test]
fn an_edit_applied_during_its_rejection_keeps_its_images() {
    let site = Site::new();
    let id = site.approved_product("Gochugaru", "spices");
    let edit_id = site
        .catalog
        .propose_edit(&user("bob@site.io"), &id, &draft("Gochugaru (coarse)", "spices"), &[], vec![jpeg()])
        .unwrap();

    let gate = site.catalog.gate().clone();
    let admin = site.admin.clone();
    site.store().before_next_commit(move || {
        assert_eq!(gate.apply_edit(&admin, &edit_id).unwrap(), EditOutcome::Applied);
    });

    let err = site.catalog.gate().reject_edit(&site.admin, &edit_id).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Conflict);

    let product = site.catalog.get_product(&Caller::Anonymous, &id).unwrap().unwrap();
    assert_eq!(product.name(), "Gochugaru (coarse)");
    assert_eq!(product.images().len(), 1);
    assert!(product.images().iter().all(|i| site.objects().contains(&i.key)));
    assert!(site.store().fetch::<ProductEdit>(&edit_id).unwrap().unwrap().approved);
}

#[test]
fn an_approval_landing_during_a_rejection_wins() {
    let site = Site::new();
    let id = site
        .catalog
        .submit_product(&user("a@site.io"), &draft("Perilla oil", "oils"), vec![jpeg()])
        .unwrap();

    let gate = site.catalog.gate().clone();
    let admin = site.admin.clone();
    site.store().before_next_commit(move || {
        gate.approve::<Product>(&admin, &id).unwrap();
    });

    let err = site.catalog.gate().reject::<Product>(&site.admin, &id).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Conflict);

    let product = site.catalog.get_product(&Caller::Anonymous, &id).unwrap().unwrap();
    assert!(site.objects().contains(&product.images()[0].key));
}

#[test]
fn edits_require_an_approved_product_and_its_own_images() {
    let site = Site::new();
    let bob = user("bob@site.io");
    let pending = site.catalog.submit_product(&bob, &draft("Natto", "ferments"), vec![]).unwrap();

    let err = site
        .catalog
        .propose_edit(&bob, &pending, &draft("Natto", "ferments"), &[], vec![])
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Conflict);

    let approved = site.approved_product("Tempeh", "ferments");
    let foreign = tastemark_core::BlobKey::new("products/other/x.jpg");
    let err = site
        .catalog
        .propose_edit(&bob, &approved, &draft("Tempeh", "ferments"), &[foreign], vec![])
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Validation);
    assert_eq!(site.store().count("product_edits"), 0);
}

#[test]
fn recipes_go_through_the_same_gate() {
    let site = Site::new();
    let product = site.approved_product("Gochugaru", "spices");
    let carol = user("carol@site.io");

    let recipe_id = site
        .catalog
        .submit_recipe(
            &carol,
            &RecipeDraft {
                title: "Quick kimchi".into(),
                steps: vec!["Salt the cabbage".into(), " ".into(), "Mix the paste".into()],
                product_ids: vec![product, product],
            },
            vec![jpeg()],
        )
        .unwrap();

    assert!(site.catalog.recipes_using(&product).unwrap().is_empty());
    site.catalog.gate().approve::<Recipe>(&site.admin, &recipe_id).unwrap();

    let recipes = site.catalog.recipes_using(&product).unwrap();
    assert_eq!(recipes.len(), 1);
    assert_eq!(recipes[0].steps.len(), 2);
    assert_eq!(recipes[0].product_ids, vec![product]);
    assert!(recipes[0].is_visible_to(Audience::Public));
}

fn arb_decisions() -> impl Strategy<Value = Vec<bool>> {
    prop::collection::vec(any::<bool>(), 1..12)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn public_listing_is_exactly_the_approved_set(decisions in arb_decisions()) {
        let site = Site::new();
        let author = user("author@site.io");

        let mut expected = Vec::new();
        for (i, approve) in decisions.iter().enumerate() {
            let id = site
                .catalog
                .submit_product(&author, &draft(&format!("Product {i:02}"), "misc"), vec![])
                .unwrap();
            if *approve {
                site.catalog.gate().approve::<Product>(&site.admin, &id).unwrap();
                // Approving again never changes the outcome.
                prop_assert_eq!(
                    site.catalog.gate().approve::<Product>(&site.admin, &id).unwrap(),
                    ApprovalOutcome::AlreadyApproved
                );
                expected.push(id);
            }
        }

        let public: Vec<_> = site
            .catalog
            .list_products(&Caller::Anonymous, Audience::Public)
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        prop_assert_eq!(public, expected);

        let queue = site.catalog.list_products(&site.admin, Audience::Moderators).unwrap();
        prop_assert_eq!(queue.len(), decisions.iter().filter(|d| !**d).count());
        prop_assert!(queue.iter().all(|p| !p.approved));
    }
}
