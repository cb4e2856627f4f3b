// glspace/src/tests.rs
//
//! Unit tests.

use crate::matcher;
use crate::platform::generic::headless::{HeadlessEvent, HeadlessPlatform, HeadlessScreen};
use crate::platform::{ObjectKind, ScreenExtension};
use crate::{Attribute, AttributeKind, ConfigAttributes, Connection, Context, ContextAttributes};
use crate::{Error, GLVersion, ObjectSpace, Template, WindowingApiError};

use euclid::default::{Point2D, Rect, Size2D};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

const SIZES: [u32; 8] = [0, 1, 2, 4, 8, 16, 24, 32];

fn screen_rect() -> Rect<i32> {
    Rect::new(Point2D::zero(), Size2D::new(640, 480))
}

fn connect(configs: Vec<ConfigAttributes>) -> (Arc<HeadlessPlatform>, Connection) {
    let platform = Arc::new(
        HeadlessPlatform::new()
            .with_display("test:0", vec![HeadlessScreen::new(screen_rect()).with_configs(configs)]),
    );
    let connection = Connection::new(platform.clone());
    (platform, connection)
}

fn connect_standard() -> (Arc<HeadlessPlatform>, Connection) {
    let platform = Arc::new(HeadlessPlatform::default());
    let connection = Connection::new(platform.clone());
    (platform, connection)
}

fn buffers(double_buffer: bool, depth_size: u32) -> ConfigAttributes {
    ConfigAttributes { double_buffer, depth_size, ..ConfigAttributes::default() }
}

fn random_attributes(rng: &mut StdRng) -> ConfigAttributes {
    let mut attributes = ConfigAttributes::default();
    for &attribute in Attribute::ALL {
        let value = match attribute.kind() {
            AttributeKind::Exact => rng.gen_range(0..2),
            AttributeKind::Ranked => SIZES[rng.gen_range(0..SIZES.len())],
        };
        attributes.set(attribute, value);
    }
    attributes
}

fn random_template(rng: &mut StdRng, probability: f64) -> Template {
    let mut template = Template::new();
    add_random_requests(rng, &mut template, probability);
    template
}

fn add_random_requests(rng: &mut StdRng, template: &mut Template, probability: f64) {
    for &attribute in Attribute::ALL {
        if template.get(attribute).is_some() || !rng.gen_bool(probability) {
            continue;
        }
        let value = match attribute.kind() {
            AttributeKind::Exact => rng.gen_range(0..2),
            AttributeKind::Ranked => SIZES[rng.gen_range(0..SIZES.len())],
        };
        template.set(attribute, Some(value));
    }
}

#[test]
fn test_matching_scenario() {
    let (_, connection) =
        connect(vec![buffers(true, 16), buffers(true, 24), buffers(false, 24)]);
    let screen = connection.default_screen().unwrap();
    let configs = screen.configs().unwrap();

    let template = Template::new()
        .with(Attribute::DoubleBuffer, 1)
        .with(Attribute::DepthSize, 24);
    let config = screen.best_config(&template).unwrap();
    assert_eq!(config.native_config(), configs[1].native_config());
    assert_eq!(config.attributes(), configs[1].attributes());

    let template = Template::new()
        .with(Attribute::DoubleBuffer, 1)
        .with(Attribute::DepthSize, 32);
    assert_eq!(screen.best_config(&template), Err(Error::NoSuchConfig));
    assert!(screen.matching_configs(&template).unwrap().is_empty());
}

#[test]
fn test_matching_configs_keeps_catalog_order() {
    let (_, connection) =
        connect(vec![buffers(true, 32), buffers(false, 24), buffers(true, 24)]);
    let screen = connection.default_screen().unwrap();
    let template = Template::new().with(Attribute::DepthSize, 24);
    let depths: Vec<u32> = screen
        .matching_configs(&template)
        .unwrap()
        .iter()
        .map(|config| config.get(Attribute::DepthSize))
        .collect();
    assert_eq!(depths, vec![32, 24, 24]);

    // Ranking prefers the least excess; ties fall back to catalog order.
    let best = screen.best_config(&template).unwrap();
    assert_eq!(best.attributes(), &buffers(false, 24));
}

#[test]
fn test_empty_template_matches_everything() {
    let (_, connection) = connect_standard();
    let screen = connection.default_screen().unwrap();
    let all = screen.configs().unwrap();
    assert!(!all.is_empty());
    assert_eq!(screen.matching_configs(&Template::new()).unwrap(), all);
}

#[test]
fn test_matching_monotonicity() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let catalog: Vec<ConfigAttributes> = (0..64).map(|_| random_attributes(&mut rng)).collect();
    for _ in 0..256 {
        let loose = random_template(&mut rng, 0.2);
        let mut strict = loose;
        add_random_requests(&mut rng, &mut strict, 0.3);
        for attributes in &catalog {
            if matcher::satisfies(&strict, attributes) {
                assert!(matcher::satisfies(&loose, attributes), "{} vs {}", strict, loose);
            }
        }
        let strict_matches = matcher::filter(&strict, &catalog[..]);
        let loose_matches = matcher::filter(&loose, &catalog[..]);
        assert!(strict_matches.iter().all(|entry| loose_matches.contains(entry)));
    }
}

#[test]
fn test_no_under_delivery_and_determinism() {
    let mut rng = StdRng::seed_from_u64(42);
    let catalog: Vec<ConfigAttributes> = (0..48).map(|_| random_attributes(&mut rng)).collect();
    let (_, connection) = connect(catalog.clone());
    let screen = connection.default_screen().unwrap();

    let mut found = 0;
    for _ in 0..200 {
        let template = random_template(&mut rng, 0.15);
        match screen.best_config(&template) {
            Ok(config) => {
                found += 1;
                for (attribute, requested) in template.requests() {
                    let value = config.get(attribute);
                    match attribute.kind() {
                        AttributeKind::Ranked => assert!(value >= requested, "{}", attribute),
                        AttributeKind::Exact => assert_eq!(value, requested, "{}", attribute),
                    }
                }
                assert_eq!(screen.best_config(&template).unwrap(), config);
                assert_eq!(matcher::best(&template, &catalog[..]), Ok(config.attributes()));
                assert_eq!(matcher::rank(&template, &catalog[..])[0], config.attributes());
            }
            Err(err) => {
                assert_eq!(err, Error::NoSuchConfig);
                assert!(catalog.iter().all(|entry| !matcher::satisfies(&template, entry)));
            }
        }
    }
    assert!(found > 0);
}

#[test]
fn test_best_config_from_falls_back() {
    let (_, connection) = connect(vec![buffers(true, 24), buffers(true, 16)]);
    let screen = connection.default_screen().unwrap();

    let preferred = Template::window_default().with(Attribute::Samples, 4);
    let minimal = Template::new();
    let config = screen.best_config_from(&[preferred, minimal]).unwrap();
    assert_eq!(config.get(Attribute::Samples), 0);
    assert_eq!(screen.best_config_from(&[preferred]), Err(Error::NoSuchConfig));
    assert_eq!(screen.best_config_from(&[]), Err(Error::NoSuchConfig));
}

#[test]
fn test_catalog_is_cached_until_refreshed() {
    let (platform, connection) = connect_standard();
    let screen = connection.default_screen().unwrap();
    assert_eq!(platform.enumeration_count(), 0);

    let first = screen.configs().unwrap();
    screen.best_config(&Template::window_default()).unwrap();
    assert_eq!(platform.enumeration_count(), 1);

    screen.refresh_configs();
    assert_eq!(screen.configs().unwrap(), first);
    assert_eq!(platform.enumeration_count(), 2);
}

#[test]
fn test_display_singleton() {
    let (_, connection) = connect_standard();
    let display = connection.default_display().unwrap();
    assert!(display.ptr_eq(&connection.display(None).unwrap()));
    assert!(display.ptr_eq(&connection.display(Some(display.name())).unwrap()));
    assert_eq!(connection.display(Some("missing:7")), Err(Error::ConnectionFailed));
    assert_eq!(display.screens().len(), 1);
    assert!(display.screen(1).is_none());
    assert_eq!(display.default_screen().rect().size, Size2D::new(1920, 1080));
}

#[test]
fn test_display_without_screens() {
    let platform = Arc::new(HeadlessPlatform::new().with_display("empty:0", vec![]));
    let connection = Connection::new(platform);
    assert_eq!(connection.default_display(), Err(Error::NoScreens));
}

#[test]
fn test_screen_extension() {
    let extension = ScreenExtension::X11 { screen_number: 1, root_window: 0x2a };
    let screen = HeadlessScreen::new(screen_rect())
        .with_config(buffers(true, 24))
        .with_extension(extension.clone());
    let platform = Arc::new(HeadlessPlatform::new().with_display("ext:0", vec![screen]));
    let connection = Connection::new(platform);
    let screen = connection.default_screen().unwrap();
    assert_eq!(screen.extension(), Some(&extension));
    assert_eq!(screen.index(), 0);
}

#[test]
fn test_object_space_lifecycle() {
    let (platform, connection) = connect_standard();
    let config = connection.default_screen().unwrap().best_config(&Template::new()).unwrap();

    let destroyed = Arc::new(AtomicUsize::new(0));
    let c1 = config.create_context(None).unwrap();
    let space = c1.object_space().clone();
    let counter = destroyed.clone();
    space.on_destroy(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(space.live_contexts(), 1);
    assert_eq!(space.creator(), Some(c1.id()));

    let c2 = config.create_context(Some(&c1)).unwrap();
    assert!(c2.object_space().ptr_eq(&space));
    assert_eq!(space.live_contexts(), 2);
    assert_eq!(platform.share_group(c1.native_context()), platform.share_group(c2.native_context()));

    c1.destroy().unwrap();
    assert_eq!(space.live_contexts(), 1);
    assert!(!space.is_destroyed());
    assert_eq!(destroyed.load(Ordering::SeqCst), 0);

    c2.destroy().unwrap();
    assert_eq!(space.live_contexts(), 0);
    assert!(space.is_destroyed());
    assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    assert_eq!(platform.live_native_contexts(), 0);
}

#[test]
fn test_object_space_destroyed_once_in_any_order() {
    let mut rng = StdRng::seed_from_u64(7);
    let (_, connection) = connect_standard();
    let config = connection.default_screen().unwrap().best_config(&Template::new()).unwrap();

    for round in 1..=12 {
        let root = config.create_context(None).unwrap();
        let space = root.object_space().clone();
        let destroyed = Arc::new(AtomicUsize::new(0));
        let counter = destroyed.clone();
        space.on_destroy(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let mut contexts = vec![root];
        for _ in 1..round {
            let share = contexts[rng.gen_range(0..contexts.len())].clone();
            contexts.push(config.create_context(Some(&share)).unwrap());
        }
        assert_eq!(space.live_contexts(), round);

        contexts.shuffle(&mut rng);
        let count = contexts.len();
        for (index, context) in contexts.into_iter().enumerate() {
            assert_eq!(destroyed.load(Ordering::SeqCst), 0);
            context.destroy().unwrap();
            assert_eq!(space.live_contexts(), count - index - 1);
        }
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
        assert!(space.is_destroyed());
    }
    assert_eq!(connection.registry().live_context_count(), 0);
}

#[test]
fn test_sharing_preserves_resources() {
    let (platform, connection) = connect_standard();
    let config = connection.default_screen().unwrap().best_config(&Template::new()).unwrap();

    let a = config.create_context(None).unwrap();
    a.object_space().set_annotation("textures.atlas", 17u32).unwrap();
    let b = config.create_context(Some(&a)).unwrap();
    a.destroy().unwrap();

    let space = b.object_space();
    assert!(!space.is_destroyed());
    assert_eq!(space.annotation::<u32>("textures.atlas").as_deref(), Some(&17));
    assert_eq!(space.creator(), Some(a.id()));

    b.make_current().unwrap();
    b.delete_objects(ObjectKind::Texture, &[17]).unwrap();
    assert_eq!(
        platform.events().last(),
        Some(&HeadlessEvent::ObjectsDeleted {
            context: b.native_context(),
            kind: ObjectKind::Texture,
            names: vec![17],
        })
    );

    b.destroy().unwrap();
    assert!(space.is_destroyed());
    assert!(!space.has_annotation("textures.atlas"));
    assert_eq!(space.set_annotation("late", 1u8), Err(Error::ObjectSpaceDestroyed));
}

#[test]
fn test_annotations() {
    let space = ObjectSpace::new();
    space.set_annotation("answer", 42i32).unwrap();
    assert_eq!(space.annotation::<i32>("answer").as_deref(), Some(&42));
    assert!(space.annotation::<u32>("answer").is_none());
    space.set_annotation("answer", String::from("forty-two")).unwrap();
    assert_eq!(space.annotation::<String>("answer").unwrap().as_str(), "forty-two");
    assert_eq!(space.remove_annotation("answer"), Ok(true));
    assert_eq!(space.remove_annotation("answer"), Ok(false));
    assert!(space.creator().is_none());
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "reserved")]
fn test_reserved_annotation_key_panics() {
    let space = ObjectSpace::new();
    let _ = space.set_annotation("glspace.creator", 0u64);
}

#[cfg(not(debug_assertions))]
#[test]
fn test_reserved_annotation_key_is_rejected() {
    let (_, connection) = connect_standard();
    let config = connection.default_screen().unwrap().best_config(&Template::new()).unwrap();
    let context = config.create_context(None).unwrap();
    let space = context.object_space();
    assert_eq!(space.set_annotation("glspace.creator", 0u64), Err(Error::ReservedAnnotationKey));
    assert_eq!(space.remove_annotation("glspace.creator"), Err(Error::ReservedAnnotationKey));
    assert_eq!(space.creator(), Some(context.id()));
    context.destroy().unwrap();
}

#[test]
#[should_panic(expected = "released more times than it was acquired")]
fn test_double_release_panics() {
    let space = ObjectSpace::new();
    space.acquire().unwrap();
    space.release();
    assert_eq!(space.acquire(), Err(Error::ObjectSpaceDestroyed));
    let fresh = ObjectSpace::new();
    fresh.release();
}

#[test]
fn test_stale_config_is_unresolved() {
    let (platform, connection) = connect_standard();
    let screen = connection.default_screen().unwrap();
    let config = screen.best_config(&Template::window_default()).unwrap();

    // The cached catalog still vouches for the config, but the platform refuses it.
    assert!(platform.retire_config(config.native_config()));
    assert_eq!(
        config.create_context(None),
        Err(Error::ContextCreationFailed(WindowingApiError::BadPixelFormat))
    );

    screen.refresh_configs();
    assert_eq!(config.create_context(None), Err(Error::UnresolvedConfig));
    assert_eq!(config.create_context_with_default_share(), Err(Error::UnresolvedConfig));
    assert!(screen.configs().unwrap().iter().all(|other| other != &config));
}

#[test]
fn test_unsupported_gl_version() {
    let platform = Arc::new(HeadlessPlatform::default().with_max_version(GLVersion::new(3, 3)));
    let connection = Connection::new(platform.clone());
    let screen = connection.default_screen().unwrap();

    let template = Template::window_default().with_context_version(GLVersion::new(4, 5));
    let config = screen.best_config(&template).unwrap();
    assert_eq!(config.context_attributes().version, Some(GLVersion::new(4, 5)));
    assert_eq!(config.create_context(None), Err(Error::UnsupportedGLVersion));
    assert_eq!(connection.registry().live_context_count(), 0);

    let config = config.with_context_attributes(ContextAttributes {
        version: Some(GLVersion::new(3, 3)),
        ..ContextAttributes::default()
    });
    let context = config.create_context(None).unwrap();
    context.destroy().unwrap();
    assert_eq!(platform.live_native_contexts(), 0);
}

#[test]
fn test_make_current_supersedes() {
    let (platform, connection) = connect_standard();
    let config = connection.default_screen().unwrap().best_config(&Template::new()).unwrap();
    let a = config.create_context(None).unwrap();
    let b = config.create_context(None).unwrap();

    assert!(connection.current_context().is_none());
    a.make_current().unwrap();
    assert!(a.is_current());
    assert_eq!(connection.current_context(), Some(a.clone()));

    b.make_current().unwrap();
    assert!(!a.is_current());
    assert!(!a.is_destroyed());
    assert!(b.is_current());
    assert_eq!(connection.current_context(), Some(b.clone()));
    assert_eq!(platform.current_native_context(), Some(b.native_context()));

    connection.registry().make_no_context_current().unwrap();
    assert!(!b.is_current());
    assert!(connection.current_context().is_none());
    assert_eq!(platform.current_native_context(), None);

    a.destroy().unwrap();
    b.destroy().unwrap();
}

#[test]
fn test_destroy_clears_current() {
    let (platform, connection) = connect_standard();
    let config = connection.default_screen().unwrap().best_config(&Template::new()).unwrap();
    let context = config.create_context(None).unwrap();
    context.make_current().unwrap();

    context.destroy().unwrap();
    assert!(context.is_destroyed());
    assert!(!context.is_current());
    assert!(connection.current_context().is_none());
    assert_eq!(platform.current_native_context(), None);

    // Destroying twice is harmless; a destroyed context can't be made current.
    context.destroy().unwrap();
    assert_eq!(
        context.make_current(),
        Err(Error::MakeCurrentFailed(WindowingApiError::BadContext))
    );
    assert_eq!(context.object_space().live_contexts(), 0);
}

#[test]
fn test_current_on_another_thread() {
    let (_, connection) = connect_standard();
    let config = connection.default_screen().unwrap().best_config(&Template::new()).unwrap();
    let context = config.create_context(None).unwrap();
    context.make_current().unwrap();

    thread::scope(|scope| {
        scope.spawn(|| {
            assert!(!context.is_current());
            assert!(connection.current_context().is_none());
            assert_eq!(
                context.make_current(),
                Err(Error::MakeCurrentFailed(WindowingApiError::BadAccess))
            );
            // Releasing from a thread it isn't current on does nothing.
            context.release_current().unwrap();
        });
    });
    assert!(context.is_current());

    context.release_current().unwrap();
    thread::scope(|scope| {
        scope.spawn(|| {
            context.make_current().unwrap();
            assert_eq!(connection.current_context(), Some(context.clone()));
            context.release_current().unwrap();
        });
    });
    context.destroy().unwrap();
}

#[test]
fn test_deferred_object_deletion() {
    let (platform, connection) = connect_standard();
    let config = connection.default_screen().unwrap().best_config(&Template::new()).unwrap();
    let a = config.create_context(None).unwrap();
    let b = config.create_context(Some(&a)).unwrap();
    a.make_current().unwrap();

    b.delete_objects(ObjectKind::Texture, &[1, 2]).unwrap();
    b.delete_objects(ObjectKind::Program, &[9]).unwrap();
    b.delete_objects(ObjectKind::Buffer, &[]).unwrap();
    assert_eq!(b.object_space().doomed_object_count(), 3);
    let before = platform.events().len();

    b.make_current().unwrap();
    assert_eq!(b.object_space().doomed_object_count(), 0);
    let deleted: Vec<HeadlessEvent> = platform.events()[before..]
        .iter()
        .filter(|event| matches!(event, HeadlessEvent::ObjectsDeleted { .. }))
        .cloned()
        .collect();
    assert_eq!(
        deleted,
        vec![
            HeadlessEvent::ObjectsDeleted {
                context: b.native_context(),
                kind: ObjectKind::Texture,
                names: vec![1, 2],
            },
            HeadlessEvent::ObjectsDeleted {
                context: b.native_context(),
                kind: ObjectKind::Program,
                names: vec![9],
            },
        ]
    );

    // Pending deletions die with the space.
    a.delete_objects(ObjectKind::Shader, &[5]).unwrap();
    assert_eq!(a.object_space().doomed_object_count(), 1);
    a.destroy().unwrap();
    b.destroy().unwrap();
    assert_eq!(b.object_space().doomed_object_count(), 0);
}

#[test]
fn test_default_share_uses_shadow_then_most_recent() {
    let (platform, connection) = connect_standard();
    let screen = connection.default_screen().unwrap();
    let config = screen.best_config(&Template::new()).unwrap();
    let registry = connection.registry();
    assert!(registry.shadow_context(screen.display()).is_none());

    let first = config.create_context_with_default_share().unwrap();
    let shadow = registry.shadow_context(screen.display()).unwrap();
    assert!(shadow.is_shadow());
    assert!(!first.is_shadow());
    assert!(first.object_space().ptr_eq(shadow.object_space()));
    assert!(shadow.config().satisfies(&Template::window_default()));
    assert_eq!(registry.live_contexts(), vec![first.clone()]);

    let second = config.create_context_with_default_share().unwrap();
    assert!(second.object_space().ptr_eq(first.object_space()));
    assert_eq!(registry.most_recent_context(), Some(second.clone()));
    assert_eq!(
        platform.events().iter().filter(|event| matches!(event, HeadlessEvent::ContextCreated { .. })).count(),
        3
    );

    second.destroy().unwrap();
    first.destroy().unwrap();
    assert!(registry.most_recent_context().is_none());

    // The shadow outlives every user-visible context.
    let third = config.create_context_with_default_share().unwrap();
    assert!(third.object_space().ptr_eq(shadow.object_space()));
    assert!(connection.shadow_context().unwrap().ptr_eq(&shadow));
    third.destroy().unwrap();

    assert_eq!(platform.live_native_contexts(), 1);
    drop(connection);
    assert_eq!(platform.live_native_contexts(), 0);
    assert!(shadow.is_destroyed());
}

#[test]
fn test_default_share_override() {
    let (_, connection) = connect_standard();
    let config = connection.default_screen().unwrap().best_config(&Template::new()).unwrap();
    let registry = connection.registry();

    let pinned = config.create_context(None).unwrap();
    let newer = config.create_context(None).unwrap();
    registry.set_default_share_source(Some(&pinned));
    assert_eq!(registry.default_share_override(), Some(pinned.clone()));

    let shared = config.create_context_with_default_share().unwrap();
    assert!(shared.object_space().ptr_eq(pinned.object_space()));
    assert!(!shared.object_space().ptr_eq(newer.object_space()));

    // The override lapses with its context.
    pinned.destroy().unwrap();
    assert!(registry.default_share_override().is_none());
    let fallback = config.create_context_with_default_share().unwrap();
    assert!(fallback.object_space().ptr_eq(shared.object_space()));

    registry.set_default_share_source(None);
    for context in [newer, shared, fallback] {
        context.destroy().unwrap();
    }
    assert!(registry.shadow_context(config.screen().display()).is_none());
}

#[test]
fn test_destroyed_shadow_is_recreated() {
    let (platform, connection) = connect_standard();
    let screen = connection.default_screen().unwrap();
    let config = screen.best_config(&Template::new()).unwrap();
    let registry = connection.registry();

    let old_shadow = connection.shadow_context().unwrap();
    old_shadow.destroy().unwrap();
    assert!(old_shadow.object_space().is_destroyed());
    assert!(registry.shadow_context(screen.display()).is_none());

    let context = config.create_context_with_default_share().unwrap();
    let new_shadow = registry.shadow_context(screen.display()).unwrap();
    assert!(!new_shadow.is_destroyed());
    assert!(!new_shadow.ptr_eq(&old_shadow));
    assert!(context.object_space().ptr_eq(new_shadow.object_space()));
    assert!(connection.shadow_context().unwrap().ptr_eq(&new_shadow));

    context.destroy().unwrap();
    assert_eq!(platform.live_native_contexts(), 1);
    drop(connection);
    assert_eq!(platform.live_native_contexts(), 0);
    assert!(new_shadow.is_destroyed());
}

#[test]
fn test_default_share_stays_on_the_requesting_display() {
    let platform = Arc::new(
        HeadlessPlatform::new()
            .with_display("left:0", vec![HeadlessScreen::new(screen_rect()).with_config(buffers(true, 24))])
            .with_display("right:0", vec![HeadlessScreen::new(screen_rect()).with_config(buffers(true, 24))]),
    );
    let connection = Connection::new(platform.clone());
    let registry = connection.registry();
    let left = connection.display(Some("left:0")).unwrap();
    let right = connection.display(Some("right:0")).unwrap();
    let left_config = left.default_screen().best_config(&Template::new()).unwrap();
    let right_config = right.default_screen().best_config(&Template::new()).unwrap();

    let pinned = left_config.create_context(None).unwrap();
    registry.set_default_share_source(Some(&pinned));
    let newest_left = left_config.create_context(None).unwrap();

    // Neither the override nor the most recent context is on the right display.
    let on_right = right_config.create_context_with_default_share().unwrap();
    let right_shadow = registry.shadow_context(&right).unwrap();
    assert!(on_right.object_space().ptr_eq(right_shadow.object_space()));
    assert!(!on_right.object_space().ptr_eq(pinned.object_space()));
    assert!(!on_right.object_space().ptr_eq(newest_left.object_space()));
    assert!(registry.shadow_context(&left).is_none());

    let again = right_config.create_context_with_default_share().unwrap();
    assert!(again.object_space().ptr_eq(on_right.object_space()));
    let on_left = left_config.create_context_with_default_share().unwrap();
    assert!(on_left.object_space().ptr_eq(pinned.object_space()));

    for context in [pinned, newest_left, on_right, again, on_left] {
        context.destroy().unwrap();
    }
    let left_only = left_config.create_context_with_default_share().unwrap();
    let left_shadow = registry.shadow_context(&left).unwrap();
    assert!(!left_shadow.ptr_eq(&right_shadow));
    assert!(left_only.object_space().ptr_eq(left_shadow.object_space()));
    left_only.destroy().unwrap();

    assert_eq!(platform.live_native_contexts(), 2);
    drop(connection);
    assert_eq!(platform.live_native_contexts(), 0);
}

#[test]
fn test_taking_events_drains_the_log() {
    let (platform, connection) = connect_standard();
    let config = connection.default_screen().unwrap().best_config(&Template::new()).unwrap();
    let context = config.create_context(None).unwrap();
    context.make_current().unwrap();

    let taken = platform.take_events();
    assert!(matches!(taken.first(), Some(HeadlessEvent::ContextCreated { share: None, .. })));
    assert!(taken.iter().any(|event| matches!(event, HeadlessEvent::MadeCurrent(Some(_)))));
    assert!(platform.events().is_empty());
    assert!(platform.take_events().is_empty());

    context.destroy().unwrap();
    let events = platform.events();
    assert!(events.iter().any(|event| matches!(event, HeadlessEvent::ContextDestroyed(_))));
    assert!(!events.iter().any(|event| matches!(event, HeadlessEvent::ContextCreated { .. })));
}

#[test]
fn test_incompatible_share_context() {
    let platform = Arc::new(
        HeadlessPlatform::new()
            .with_display("left:0", vec![HeadlessScreen::new(screen_rect()).with_config(buffers(true, 24))])
            .with_display("right:0", vec![HeadlessScreen::new(screen_rect()).with_config(buffers(true, 24))]),
    );
    let connection = Connection::new(platform);
    let left = connection.display(Some("left:0")).unwrap().default_screen();
    let right = connection.display(Some("right:0")).unwrap().default_screen();
    let left_config = left.best_config(&Template::new()).unwrap();
    let right_config = right.best_config(&Template::new()).unwrap();

    let context = left_config.create_context(None).unwrap();
    assert_eq!(
        right_config.create_context(Some(&context)),
        Err(Error::IncompatibleSharedContext)
    );

    context.destroy().unwrap();
    assert_eq!(
        left_config.create_context(Some(&context)),
        Err(Error::IncompatibleSharedContext)
    );
    assert_eq!(connection.registry().live_context_count(), 0);
}

#[test]
fn test_connection_closed() {
    let (_, connection) = connect_standard();
    let config = connection.default_screen().unwrap().best_config(&Template::new()).unwrap();
    drop(connection);
    assert_eq!(config.create_context(None), Err(Error::ConnectionClosed));
}

#[test]
fn test_context_ids_are_unique() {
    let (_, connection) = connect_standard();
    let config = connection.default_screen().unwrap().best_config(&Template::new()).unwrap();
    let contexts: Vec<Context> = (0..8).map(|_| config.create_context(None).unwrap()).collect();
    let mut ids: Vec<_> = contexts.iter().map(Context::id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), contexts.len());
    for context in contexts {
        context.destroy().unwrap();
    }
}

#[test]
fn test_concurrent_creation_and_destruction() {
    let (platform, connection) = connect_standard();
    let config = connection.default_screen().unwrap().best_config(&Template::new()).unwrap();
    let root = config.create_context(None).unwrap();
    let space = root.object_space().clone();
    let peak = Mutex::new(0);

    thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                for _ in 0..16 {
                    let context = config.create_context(Some(&root)).unwrap();
                    context.make_current().unwrap();
                    {
                        let mut peak = peak.lock().unwrap();
                        *peak = (*peak).max(space.live_contexts());
                    }
                    context.destroy().unwrap();
                }
            });
        }
    });

    assert!(*peak.lock().unwrap() >= 2);
    assert_eq!(space.live_contexts(), 1);
    assert!(!space.is_destroyed());
    root.destroy().unwrap();
    assert!(space.is_destroyed());
    assert_eq!(platform.live_native_contexts(), 0);
}

#[test]
#[should_panic(expected = "Contexts must be destroyed explicitly")]
fn test_dropping_live_context_panics() {
    let (_, connection) = connect_standard();
    let config = connection.default_screen().unwrap().best_config(&Template::new()).unwrap();
    let context = config.create_context(None).unwrap();
    drop(context);
}

#[cfg(x11)]
#[test]
#[serial_test::serial]
fn test_x11_smoke() {
    let connection = match Connection::x11() {
        Ok(connection) => connection,
        Err(_) => return,
    };
    let screen = match connection.default_screen() {
        Ok(screen) => screen,
        Err(_) => return,
    };
    assert!(screen.extension().is_some());
    let config = screen.best_config_from(&[Template::window_default(), Template::new()]).unwrap();
    let context = config.create_context(None).unwrap();
    let shared = config.create_context(Some(&context)).unwrap();
    context.make_current().unwrap();
    shared.delete_objects(ObjectKind::Texture, &[1]).unwrap();
    context.destroy().unwrap();
    shared.destroy().unwrap();
}
