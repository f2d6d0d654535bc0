//! Integration test: both index strategies honour the same contract while
//! bodies move under physics.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tessera_core::{
    Entity, IndexStrategy, Physical, SpatialConfig, SpatialIndex, TileCoord,
};

fn config(strategy: IndexStrategy) -> SpatialConfig {
    SpatialConfig {
        strategy,
        ..SpatialConfig::default()
    }
}

#[test]
fn test_relocation_invariant_under_motion() {
    for strategy in [IndexStrategy::Curve, IndexStrategy::Hierarchical] {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut index = config(strategy).build::<usize>();
        let mut entities: Vec<Entity> = (0..200)
            .map(|_| Entity::fly(0, [rng.gen_range(-3_000.0..3_000.0), rng.gen_range(-3_000.0..3_000.0), 50.0]))
            .collect();

        for (id, entity) in entities.iter_mut().enumerate() {
            let position = entity.planar_position().unwrap_or_default();
            index.insert(id, position);
            if let Some(body) = entity.body_mut() {
                body.set_velocity(&[rng.gen_range(-400.0..400.0), rng.gen_range(-400.0..400.0), 0.0]);
            }
        }

        for _ in 0..5 {
            for (id, entity) in entities.iter_mut().enumerate() {
                let before = entity.planar_position().unwrap_or_default();
                if let Some(body) = entity.body_mut() {
                    body.tick();
                }
                let after = entity.planar_position().unwrap_or_default();
                index.relocate(id, after);

                assert!(index.at(after, 0.0).contains(&id), "{strategy:?}: lost {id}");
                let old_tile = TileCoord::from_position(before, 100.0);
                let new_tile = TileCoord::from_position(after, 100.0);
                if old_tile != new_tile {
                    assert!(!index.at(before, 0.0).contains(&id), "{strategy:?}: stale {id}");
                }
            }
        }
        assert_eq!(index.len(), entities.len());
    }
}

#[test]
fn test_removing_everything_leaves_no_tiles() {
    for strategy in [IndexStrategy::Curve, IndexStrategy::Hierarchical] {
        let mut index = config(strategy).build::<u32>();
        for id in 0..100u32 {
            index.insert(id, [f64::from(id) * 37.0, f64::from(id) * -53.0]);
        }
        assert!(index.tile_count() > 1);
        for id in 0..100u32 {
            assert!(index.remove(&id));
        }
        assert_eq!(index.tile_count(), 0);
        assert!(index.all().is_empty());
    }
}

#[test]
fn test_generic_entities_have_no_position() {
    let entity = Entity::generic();
    assert!(entity.planar_position().is_none());
    assert!(entity.body().map(Physical::kind).is_none());
}
