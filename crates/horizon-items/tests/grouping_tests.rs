//! Tests for generators bound to grouped views.

use std::sync::Arc;

use horizon_items::generator::{ContainerRole, ContainerStore};
use horizon_items::prelude::*;

type Words = ObservableCollection<&'static str>;

/// Host applying one group style to every level.
struct GroupHost {
    style: GroupStyle,
}

impl ContainerHost<&'static str> for GroupHost {
    fn group_style(&self, _group: &CollectionGroup<&'static str>, _level: usize) -> Option<GroupStyle> {
        Some(self.style)
    }
}

fn by_initial() -> GroupDescription<&'static str> {
    GroupDescription::new(|word: &&'static str| word[..1].to_string())
}

fn grouped(
    words: &Arc<Words>,
    description: GroupDescription<&'static str>,
    style: GroupStyle,
) -> (Arc<GroupedView<&'static str>>, Arc<ItemContainerGenerator<&'static str>>) {
    let view = GroupedView::new(words.clone(), vec![description]);
    let generator = ItemContainerGenerator::new(
        ContainerStore::new(),
        Arc::new(GroupHost { style }),
        view.root().clone(),
    );
    (view, generator)
}

fn generate_all(generator: &ItemContainerGenerator<&'static str>) -> Vec<ContainerId> {
    generator
        .start_at(GeneratorPosition::start(), GeneratorDirection::Forward, false)
        .expect("Failed to start generation")
        .map(|result| result.expect("Failed to generate").container)
        .collect()
}

#[test]
fn test_group_levels_get_child_generators() {
    let words = Arc::new(ObservableCollection::new(vec!["ant", "bee", "asp", "cat"]));
    let (view, generator) = grouped(&words, by_initial(), GroupStyle::new());
    assert!(generator.is_grouping());

    let groups = generate_all(&generator);
    assert_eq!(generator.chain_debug(), "[Realized{<a>, <b>, <c>}]");
    assert_eq!(generator.child_generators().len(), 3);
    let store = generator.store().clone();
    assert_eq!(store.role(groups[0]), Some(ContainerRole::Group));
    assert_eq!(store.container_type(groups[0]), Some(ContainerType::GROUP));

    let group_a = generator.child_generator(groups[0]).expect("group a has a child level");
    assert_eq!(group_a.level(), 1);
    assert!(!group_a.is_grouping());
    let a_items = generate_all(&group_a);
    let b_items = generate_all(&generator.child_generator(groups[1]).unwrap());
    assert_eq!(group_a.chain_debug(), r#"[Realized{"ant", "asp"}]"#);

    // Lookups from the top level see through the group levels.
    assert_eq!(generator.index_from_container(a_items[1]), Some(1));
    assert_eq!(generator.index_from_container(b_items[0]), Some(2));
    assert_eq!(generator.container_from_index(1), Some(a_items[1]));
    assert_eq!(generator.container_from_index(3), None);
    assert_eq!(generator.container_from_item(&ViewItem::Item("bee")), Some(b_items[0]));
    let owner = store
        .generator_for_container(a_items[1])
        .expect("container has an owning level");
    assert!(Arc::ptr_eq(&owner, &group_a));

    let group_c = view.find_group(&["c"]).unwrap();
    assert_eq!(
        generator.container_from_item(&ViewItem::Group(group_c)),
        Some(groups[2])
    );
}

#[test]
fn test_group_changes_reach_child_levels() {
    let words = Arc::new(ObservableCollection::new(vec!["ant", "bee", "asp"]));
    let (_view, generator) = grouped(&words, by_initial(), GroupStyle::new());
    let groups = generate_all(&generator);
    let group_a = generator.child_generator(groups[0]).unwrap();
    let group_b = generator.child_generator(groups[1]).unwrap();
    generate_all(&group_b);
    let store = generator.store().clone();

    words.push("dog");
    assert_eq!(generator.chain_debug(), "[Realized{<a>, <b>}, Unrealized{1}]");
    words.push("apt");
    assert_eq!(group_a.item_count(), 3);

    // Emptying a group removes it together with its level.
    assert_eq!(words.remove(1), "bee");
    assert_eq!(generator.chain_debug(), "[Realized{<a>}, Unrealized{1}]");
    assert!(group_b.is_released());
    assert!(!store.contains(groups[1]));
    assert_eq!(generator.child_generators().len(), 1);

    generator.verify().expect("top level is consistent");
    group_a.verify().expect("group level is consistent");
}

#[test]
fn test_empty_groups_hide_behind_placeholders() {
    let words = Arc::new(ObservableCollection::new(vec!["ant"]));
    let description = by_initial().with_group_names(["a", "b"]);
    let style = GroupStyle::new().with_hides_if_empty(true);
    let (view, generator) = grouped(&words, description, style);
    let store = generator.store().clone();
    let group_b = view.find_group(&["b"]).expect("predefined group");

    let groups = generate_all(&generator);
    assert_eq!(groups.len(), 2);
    let placeholder = groups[1];
    assert_eq!(store.container_type(placeholder), Some(ContainerType::PLACEHOLDER));
    assert_eq!(store.role(placeholder), Some(ContainerRole::EmptyGroupPlaceholder));
    assert!(generator.child_generator(placeholder).is_none());

    let events = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let events_clone = events.clone();
    generator.items_changed.connect(move |event| {
        events_clone.lock().push(event.action);
    });

    words.push("bee");
    let container = generator
        .container_from_item(&ViewItem::Group(group_b.clone()))
        .expect("group b is realized");
    assert_ne!(container, placeholder);
    assert!(!store.contains(placeholder));
    assert_eq!(store.container_type(container), Some(ContainerType::GROUP));
    let level_b = generator.child_generator(container).expect("group b has a child level");
    assert_eq!(level_b.item_count(), 1);
    assert_eq!(*events.lock(), vec![ChangeAction::Replace]);

    // Predefined groups stay when emptied, behind a placeholder again.
    words.remove(1);
    let container = generator
        .container_from_item(&ViewItem::Group(group_b))
        .expect("group b is still realized");
    assert_eq!(store.container_type(container), Some(ContainerType::PLACEHOLDER));
    assert!(level_b.is_released());
    assert_eq!(generator.item_count(), 2);
    generator.verify().expect("generator is consistent");
}

#[test]
fn test_release_tears_down_every_level() {
    let words = Arc::new(ObservableCollection::new(vec!["ant", "bee"]));
    let (_view, generator) = grouped(&words, by_initial(), GroupStyle::new());
    let groups = generate_all(&generator);
    for group in &groups {
        generate_all(&generator.child_generator(*group).unwrap());
    }
    let store = generator.store().clone();
    assert_eq!(store.len(), 4);
    assert_eq!(store.generator_count(), 3);

    generator.remove_all();
    assert!(store.is_empty());
    assert_eq!(store.generator_count(), 1);

    generate_all(&generator);
    generator.release();
    assert!(store.is_empty());
    assert_eq!(store.generator_count(), 0);
}
