//! Property tests for the pixel mapping and the smoothing filter

use std::collections::HashSet;

use proptest::prelude::*;

use mirror_core::actuator::ActuatorChannel;
use mirror_core::config::{DriveRange, MatrixConfig, PanelOrder};
use mirror_core::topology::TopologyMap;

/// Any matrix configuration that passes validation
fn matrix_config() -> impl Strategy<Value = MatrixConfig> {
    (
        prop::sample::select(vec![1u16, 2, 4, 8, 16]),
        1u16..=4,
        1u16..=4,
        any::<(bool, bool, bool, bool)>(),
        any::<u8>(),
    )
        .prop_filter("fits the pixel limit", |(size, px, py, _, _)| {
            (size * px) as usize * (size * py) as usize <= 2048
        })
        .prop_flat_map(|(size, panels_x, panels_y, (serpentine, mirror_x, mirror_y, swap), on_level)| {
            let base = MatrixConfig {
                width: size * panels_x,
                height: size * panels_y,
                panel_size: size,
                serpentine,
                mirror_x,
                mirror_y,
                panel_order: PanelOrder::RowMajor,
                split_column: 0,
                swap_banks: swap,
                on_level,
                brightness: 255,
            };
            (Just(base), 0..panels_x, 0u8..3, Just(panels_x), Just(panels_y))
        })
        .prop_flat_map(|(base, split, order, panels_x, panels_y)| {
            // Custom orders need equal banks: no split, or an even split
            let split = if order == 2 && split != 0 && split * 2 != panels_x {
                0
            } else {
                split
            };
            let bank_cols = if split == 0 { panels_x } else { split };
            let panels = (bank_cols * panels_y) as u8;
            let perm = Just((0..panels).collect::<Vec<u8>>()).prop_shuffle();
            (Just(MatrixConfig { split_column: split, ..base }), Just(order), perm)
        })
        .prop_map(|(mut config, order, perm)| {
            config.panel_order = match order {
                0 => PanelOrder::RowMajor,
                1 => PanelOrder::ColumnMajor,
                _ => PanelOrder::Custom(heapless::Vec::from_slice(&perm).unwrap()),
            };
            config
        })
}

proptest! {
    #[test]
    fn prop_mapping_is_bijective(config in matrix_config()) {
        prop_assert_eq!(config.validate(), Ok(()));
        let map = TopologyMap::new(&config).unwrap();

        let mut seen = HashSet::new();
        for y in 0..config.height {
            for x in 0..config.width {
                let index = map.map(x, y).unwrap();
                prop_assert!(index.bank < map.bank_count());
                prop_assert!((index.offset as usize) < map.bank_len(index.bank));
                prop_assert!(seen.insert(map.flat_index(index)));
            }
        }
        prop_assert_eq!(seen.len(), config.pixel_count());
        prop_assert_eq!(map.bank_start(map.bank_count()), config.pixel_count());
    }

    #[test]
    fn prop_filter_never_overshoots(
        alpha in 0.01f32..=1.0,
        start in 0u16..=1000,
        target in 0u16..=1000,
        ticks in 1usize..200,
    ) {
        let mut channel = ActuatorChannel::new(0, 0.0, 180.0, 16);
        channel.set_target_raw(start);
        channel.step(1.0);
        channel.set_target_raw(target);

        let goal = channel.target();
        let mut gap = (goal - channel.current()).abs();
        let rising = goal >= channel.current();
        for _ in 0..ticks {
            channel.step(alpha);
            let current = channel.current();
            let next_gap = (goal - current).abs();
            prop_assert!(next_gap <= gap + 1e-4);
            if rising {
                prop_assert!(current <= goal + 1e-3);
            } else {
                prop_assert!(current >= goal - 1e-3);
            }
            gap = next_gap;
        }
    }

    #[test]
    fn prop_drive_level_within_range(
        raw in 0u16..=2000,
        min in 0u16..2000,
        span in 1u16..2000,
    ) {
        let range = DriveRange { min, max: min + span };
        let mut channel = ActuatorChannel::new(0, 0.0, 180.0, 16);
        channel.set_target_raw(raw);
        channel.step(1.0);
        let level = channel.drive_level(range);
        prop_assert!(level >= range.min && level <= range.max);
    }
}
