use locdata_core::{
    edit_tracked, CollectionRef, CommandStack, Document, Entry, EntryKey, Language, Snapshot,
    StepOutcome, TextLine, TextLineKey, TrackedCollection, Variant, VariantKey,
};
use std::cell::Cell;
use std::rc::Rc;

type EntryView = (Entry, Vec<(Variant, Vec<TextLine>)>);

/// Visible state of the document: every attached node with its fields and
/// validity flags, in order.
fn fingerprint(doc: &Document) -> Vec<EntryView> {
    doc.entry_keys()
        .iter()
        .map(|key| {
            let entry = doc.entry(*key).expect("attached entry resolves").clone();
            let variants = entry
                .variants()
                .iter()
                .map(|variant_key| {
                    let variant = doc.variant(*variant_key).expect("variant resolves").clone();
                    let lines = variant
                        .text_lines()
                        .iter()
                        .map(|line_key| doc.text_line(*line_key).expect("line resolves").clone())
                        .collect();
                    (variant, lines)
                })
                .collect();
            (entry, variants)
        })
        .collect()
}

struct Seed {
    doc: Document,
    first: EntryKey,
    variant: VariantKey,
    line: TextLineKey,
}

fn seed() -> Seed {
    let mut doc = Document::new();
    let first = doc.push_entry(Entry::new("Bob"));
    let variant = doc
        .push_variant(first, Variant::new("greet"))
        .expect("push variant");
    let line = doc
        .push_text_line(variant, TextLine::new("Hello", Some(Language::EnglishUs)))
        .expect("push line");
    Seed {
        doc,
        first,
        variant,
        line,
    }
}

fn add_entry(doc: &mut Document, stack: &mut CommandStack, speaker: &str) -> EntryKey {
    let key = doc.alloc_entry(Entry::new(speaker));
    TrackedCollection::new(doc, stack, CollectionRef::Entries)
        .expect("entries collection")
        .add_tracked(key)
        .expect("add entry");
    key
}

/// Runs nine mixed operations and returns how many commands were pushed.
fn run_mixed_operations(seed: &mut Seed, stack: &mut CommandStack) -> usize {
    let doc = &mut seed.doc;

    let second = add_entry(doc, stack, "Ann");

    let new_variant = doc.alloc_variant(Variant::new("farewell"));
    TrackedCollection::new(doc, stack, CollectionRef::Variants(second))
        .expect("variants collection")
        .add_tracked(new_variant)
        .expect("add variant");

    let new_line = doc.alloc_text_line(TextLine::new("Bye", Some(Language::EnglishUs)));
    TrackedCollection::new(doc, stack, CollectionRef::TextLines(new_variant))
        .expect("lines collection")
        .add_tracked(new_line)
        .expect("add line");

    edit_tracked(doc, stack, seed.first, Snapshot::new().speaker("Bill"))
        .expect("edit speaker")
        .expect("speaker changed");

    TrackedCollection::new(doc, stack, CollectionRef::TextLines(seed.variant))
        .expect("lines collection")
        .remove_tracked(seed.line)
        .expect("remove line");

    edit_tracked(
        doc,
        stack,
        new_line,
        Snapshot::new()
            .text("Au revoir")
            .language(Some(Language::French)),
    )
    .expect("edit line")
    .expect("line changed");

    let inserted = doc.alloc_entry(Entry::new("Cid"));
    TrackedCollection::new(doc, stack, CollectionRef::Entries)
        .expect("entries collection")
        .insert_tracked(0, inserted)
        .expect("insert entry");

    TrackedCollection::new(doc, stack, CollectionRef::Entries)
        .expect("entries collection")
        .remove_tracked(seed.first)
        .expect("remove entry");

    edit_tracked(doc, stack, new_variant, Snapshot::new().variant_name("goodbye"))
        .expect("edit variant")
        .expect("variant changed");

    9
}

#[test]
fn undoing_every_operation_restores_the_original_document() {
    let mut seed = seed();
    let mut stack = CommandStack::new();
    let before = fingerprint(&seed.doc);

    let count = run_mixed_operations(&mut seed, &mut stack);
    assert_eq!(stack.undo_count(), count);
    assert_ne!(fingerprint(&seed.doc), before);

    for _ in 0..count {
        assert_eq!(stack.undo(&mut seed.doc), StepOutcome::Applied);
    }
    assert_eq!(fingerprint(&seed.doc), before);
    assert_eq!(stack.redo_count(), count);
}

#[test]
fn redoing_every_undone_operation_restores_the_edited_document() {
    let mut seed = seed();
    let mut stack = CommandStack::new();
    let count = run_mixed_operations(&mut seed, &mut stack);
    let after = fingerprint(&seed.doc);

    for _ in 0..count {
        stack.undo(&mut seed.doc);
    }
    for _ in 0..count {
        assert_eq!(stack.redo(&mut seed.doc), StepOutcome::Applied);
    }
    assert_eq!(fingerprint(&seed.doc), after);
    assert_eq!(stack.undo_count(), count);
    assert_eq!(stack.redo_count(), 0);
}

#[test]
fn pushing_after_undo_truncates_redo_history() {
    let mut seed = seed();
    let mut stack = CommandStack::new();
    run_mixed_operations(&mut seed, &mut stack);

    stack.undo(&mut seed.doc);
    stack.undo(&mut seed.doc);
    assert_eq!(stack.redo_count(), 2);

    add_entry(&mut seed.doc, &mut stack, "Dee");
    assert_eq!(stack.redo_count(), 0);
    assert_eq!(stack.undo_count(), 8);
}

#[test]
fn refresh_is_idempotent() {
    let mut seed = seed();
    let mut stack = CommandStack::new();
    run_mixed_operations(&mut seed, &mut stack);
    stack.undo(&mut seed.doc);
    stack.undo(&mut seed.doc);
    stack.undo(&mut seed.doc);

    let doomed = seed.doc.entry_keys()[1];
    seed.doc.remove_entry(doomed);

    stack.refresh(&seed.doc);
    let counts = (stack.undo_count(), stack.redo_count());
    assert_eq!(stack.refresh(&seed.doc), 0);
    assert_eq!((stack.undo_count(), stack.redo_count()), counts);
}

#[test]
fn undo_edit_then_undo_add_removes_entry() {
    let mut doc = Document::new();
    let mut stack = CommandStack::new();
    let entry = add_entry(&mut doc, &mut stack, "Bob");
    edit_tracked(&mut doc, &mut stack, entry, Snapshot::new().speaker("Bill"))
        .expect("edit speaker");
    assert_eq!(stack.undo_count(), 2);

    stack.undo(&mut doc);
    assert_eq!(doc.entry(entry).expect("entry").speaker(), "Bob");
    assert_eq!(doc.entry_keys(), &[entry]);

    stack.undo(&mut doc);
    assert!(doc.entry_keys().is_empty());
    assert_eq!(stack.undo_count(), 0);
    assert_eq!(stack.redo_count(), 2);
}

#[test]
fn raw_entry_removal_then_refresh_purges_dependent_commands() {
    let mut doc = Document::new();
    let mut stack = CommandStack::new();
    let doomed = add_entry(&mut doc, &mut stack, "Bob");
    edit_tracked(&mut doc, &mut stack, doomed, Snapshot::new().speaker("Bill"))
        .expect("edit speaker");
    let variant = doc.alloc_variant(Variant::new("v"));
    TrackedCollection::new(&mut doc, &mut stack, CollectionRef::Variants(doomed))
        .expect("variants collection")
        .add_tracked(variant)
        .expect("add variant");
    let survivor = add_entry(&mut doc, &mut stack, "Ann");

    stack.undo(&mut doc);
    assert_eq!((stack.undo_count(), stack.redo_count()), (3, 1));

    doc.remove_entry(doomed);
    assert_eq!(stack.refresh(&doc), 3);
    assert_eq!((stack.undo_count(), stack.redo_count()), (0, 1));

    stack.redo(&mut doc);
    assert_eq!(doc.entry_keys(), &[survivor]);
}

#[test]
fn edit_on_purged_line_is_discarded_on_undo() {
    let mut seed = seed();
    let mut stack = CommandStack::new();
    edit_tracked(
        &mut seed.doc,
        &mut stack,
        seed.line,
        Snapshot::new().text("Hi"),
    )
    .expect("edit text");

    seed.doc.remove_text_line(seed.line);
    assert_eq!(stack.undo(&mut seed.doc), StepOutcome::Discarded);
    assert_eq!(stack.undo_count(), 0);
    assert!(!stack.can_redo());
}

#[test]
fn edit_depending_on_purged_add_is_stale_even_if_target_survives() {
    let mut doc = Document::new();
    let mut stack = CommandStack::new();
    let owner = doc.push_entry(Entry::new("Bob"));
    let variant = doc.alloc_variant(Variant::new("v"));
    TrackedCollection::new(&mut doc, &mut stack, CollectionRef::Variants(owner))
        .expect("variants collection")
        .add_tracked(variant)
        .expect("add variant");
    edit_tracked(&mut doc, &mut stack, variant, Snapshot::new().variant_name("w"))
        .expect("rename variant");

    // Moving the variant by hand leaves the Add pointing at the old collection.
    let other = doc.push_entry(Entry::new("Ann"));
    TrackedCollection::new(&mut doc, &mut CommandStack::new(), CollectionRef::Variants(owner))
        .expect("variants collection")
        .remove_tracked(variant)
        .expect("detach variant");
    TrackedCollection::new(&mut doc, &mut CommandStack::new(), CollectionRef::Variants(other))
        .expect("variants collection")
        .add_tracked(variant)
        .expect("attach elsewhere");

    assert_eq!(stack.refresh(&doc), 2);
    assert!(stack.is_empty());
}

#[test]
fn notifiers_report_refresh_and_clear_when_history_changes() {
    let calls = Rc::new(Cell::new(0));
    let undo_calls = calls.clone();
    let mut stack = CommandStack::with_notifiers(
        Box::new(move || undo_calls.set(undo_calls.get() + 1)),
        Box::new(|| {}),
    );
    let mut doc = Document::new();
    let entry = add_entry(&mut doc, &mut stack, "Bob");
    assert_eq!(calls.get(), 1);

    stack.refresh(&doc);
    assert_eq!(calls.get(), 1);

    doc.remove_entry(entry);
    stack.refresh(&doc);
    assert_eq!(calls.get(), 2);

    add_entry(&mut doc, &mut stack, "Ann");
    stack.clear();
    assert_eq!(calls.get(), 4);
    stack.clear();
    assert_eq!(calls.get(), 4);
}

#[test]
fn redo_of_stale_add_is_discarded_without_advancing() {
    let mut doc = Document::new();
    let mut stack = CommandStack::new();
    let owner = doc.push_entry(Entry::new("Bob"));
    let variant = doc.alloc_variant(Variant::new("v"));
    TrackedCollection::new(&mut doc, &mut stack, CollectionRef::Variants(owner))
        .expect("variants collection")
        .add_tracked(variant)
        .expect("add variant");

    assert_eq!(stack.undo(&mut doc), StepOutcome::Applied);
    doc.remove_entry(owner);

    assert_eq!(stack.redo(&mut doc), StepOutcome::Discarded);
    assert_eq!((stack.undo_count(), stack.redo_count()), (0, 0));
    assert!(!doc.resolves(variant.into()));
}

#[test]
fn truncated_add_frees_its_detached_entry() {
    let mut doc = Document::new();
    let mut stack = CommandStack::new();
    let orphan = add_entry(&mut doc, &mut stack, "Bob");
    stack.undo(&mut doc);
    assert!(doc.resolves(orphan.into()));

    let kept = add_entry(&mut doc, &mut stack, "Ann");
    assert!(!doc.resolves(orphan.into()));
    assert!(doc.resolves(kept.into()));
    assert_eq!(doc.entry_keys(), &[kept]);
}

#[test]
fn cleared_history_frees_undone_and_removed_nodes() {
    let mut doc = Document::new();
    let mut stack = CommandStack::new();
    let mut undone = Vec::new();
    for round in 0..100 {
        undone.push(add_entry(&mut doc, &mut stack, &format!("speaker {round}")));
        stack.undo(&mut doc);
    }
    let owner = add_entry(&mut doc, &mut stack, "Bob");
    let variant = doc.alloc_variant(Variant::new("v"));
    TrackedCollection::new(&mut doc, &mut stack, CollectionRef::Variants(owner))
        .expect("variants collection")
        .add_tracked(variant)
        .expect("add variant");
    TrackedCollection::new(&mut doc, &mut stack, CollectionRef::Variants(owner))
        .expect("variants collection")
        .remove_tracked(variant)
        .expect("remove variant");

    stack.clear();
    stack.release_dropped(&mut doc);

    assert!(undone.iter().all(|key| !doc.resolves((*key).into())));
    assert!(!doc.resolves(variant.into()));
    assert_eq!(doc.entry_keys(), &[owner]);
    assert_eq!(stack.release_dropped(&mut doc), 0);
}

#[test]
fn detached_owner_survives_while_history_adds_into_it() {
    let mut doc = Document::new();
    let mut stack = CommandStack::new();
    let owner = doc.alloc_entry(Entry::new("Bob"));
    let variant = doc.alloc_variant(Variant::new("v"));
    TrackedCollection::new(&mut doc, &mut stack, CollectionRef::Variants(owner))
        .expect("variants collection")
        .add_tracked(variant)
        .expect("add variant");
    TrackedCollection::new(&mut doc, &mut stack, CollectionRef::Entries)
        .expect("entries collection")
        .add_tracked(owner)
        .expect("add owner");

    stack.undo(&mut doc);
    add_entry(&mut doc, &mut stack, "Ann");

    assert!(doc.resolves(owner.into()));
    assert!(doc.resolves(variant.into()));
    assert_eq!(stack.undo_count(), 2);
}
