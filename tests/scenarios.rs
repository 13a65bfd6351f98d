use chainfall::engine::{
    Grid, Kind, LockPolicy, PieceController, PieceShape, Rotation, TetrominoKind,
};
use chainfall::{FrameInput, GameConfig, GameEvent, GameSession, Intent, Phase, Variant};
use std::time::Duration;

const FRAME: Duration = Duration::from_millis(16);

fn config_6x6() -> GameConfig {
    GameConfig {
        rows: 6,
        cols: 6,
        min_match_count: 3,
        score_per_unit: 10,
        chain_bonus_multiplier: 1.0,
        seed: Some(1),
        ..GameConfig::default()
    }
}

fn matches(events: &[GameEvent]) -> Vec<(Vec<usize>, u32, u64)> {
    events
        .iter()
        .filter_map(|e| match e {
            GameEvent::Match {
                group_sizes,
                chain,
                score_delta,
                ..
            } => Some((group_sizes.clone(), *chain, *score_delta)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_simple_three_match_clears_in_one_pass() {
    let grid = Grid::from_rows(&["......", "......", "......", "......", "......", "AAABBB"]);
    let mut session = GameSession::with_grid(config_6x6(), grid).unwrap();
    session.begin_resolution();
    session.resolve_now();

    let events = session.drain_events();
    assert_eq!(matches(&events), vec![(vec![3, 3], 1, 60)]);
    assert_eq!(session.score(), 60);
    // Only the freshly spawned piece remains; the grid itself is empty.
    assert!(session.grid().is_empty());
    assert_eq!(session.phase(), Phase::Falling);
}

#[test]
fn test_cascade_chain_of_two_multiplies_second_clear() {
    let grid = Grid::from_rows(&["......", "......", "A.....", "BBB...", "ADC...", "ACD..."]);
    let mut session = GameSession::with_grid(config_6x6(), grid).unwrap();
    session.begin_resolution();
    session.resolve_now();

    let events = session.drain_events();
    assert_eq!(matches(&events), vec![(vec![3], 1, 30), (vec![3], 2, 60)]);
    assert_eq!(session.score(), 90);
    assert_eq!(
        session.grid().to_rows(),
        vec!["......", "......", "......", "......", ".DC...", ".CD..."]
    );
}

#[test]
fn test_cascade_paces_floating_cells() {
    let config = GameConfig {
        resolution_fall_speed: 10.0,
        ..config_6x6()
    };
    let grid = Grid::from_rows(&["A.....", "......", "......", "......", "......", "B....."]);
    let mut session = GameSession::with_grid(config, grid).unwrap();
    session.begin_resolution();
    assert_eq!(session.phase(), Phase::ReleaseFloating);
    assert_eq!(session.snapshot().floating.len(), 1);

    // 10 cells/s: one row per 100 ms, four rows to land.
    session.update(Duration::from_millis(250), &FrameInput::none());
    assert_eq!(session.phase(), Phase::ReleaseFloating);
    assert_eq!(session.snapshot().floating[0].y, 2);
    session.update(Duration::from_millis(250), &FrameInput::none());
    assert_eq!(session.grid().kind_at(0, 4), Some(Kind(0)));
    assert_eq!(session.phase(), Phase::Falling);
}

#[test]
fn test_rotation_kick_off_left_wall() {
    let grid = Grid::new(6, 6);
    let mut pc = PieceController::new(LockPolicy::Independent, Duration::ZERO);
    assert!(pc.try_spawn(&grid, PieceShape::Pair, &[Kind(0), Kind(1)], (0, 1)));
    // Counter-clockwise would put the partner at x = -1; the +1 kick shifts the pair right.
    assert!(pc.try_rotate(&grid, Rotation::CounterClockwise));
    let mut cells = pc.piece().unwrap().positions();
    cells.sort_unstable();
    assert_eq!(cells, vec![(0, 1), (1, 1)]);
}

#[test]
fn test_rotation_unchanged_when_kicks_collide() {
    let grid = Grid::from_rows(&[".A....", ".A....", ".A....", "......"]);
    let mut pc = PieceController::new(LockPolicy::Independent, Duration::ZERO);
    assert!(pc.try_spawn(&grid, PieceShape::Pair, &[Kind(0), Kind(1)], (0, 1)));
    let before = pc.piece().unwrap().positions();
    assert!(!pc.try_rotate(&grid, Rotation::CounterClockwise));
    assert_eq!(pc.piece().unwrap().positions(), before);
}

#[test]
fn test_game_over_at_spawn_does_not_touch_grid() {
    let config = config_6x6();
    let (sx, _) = config.spawn_position();
    let mut grid = Grid::new(6, 6);
    for y in 0..6 {
        grid.set(sx as usize, y, Kind((y % 2) as u8));
    }
    let before = grid.clone();
    let mut session = GameSession::with_grid(config, grid).unwrap();
    session.update(FRAME, &FrameInput::none());

    assert_eq!(session.phase(), Phase::GameOver);
    assert_eq!(session.grid(), &before);
    let events = session.drain_events();
    assert_eq!(events, vec![GameEvent::GameOver { score: 0 }]);

    for intent in [Intent::MoveLeft, Intent::HardDrop] {
        session.update(FRAME, &FrameInput::press(intent));
    }
    assert!(session.drain_events().is_empty());
    assert_eq!(session.grid(), &before);
}

#[test]
fn test_stack_to_top_ends_game() {
    let mut session = GameSession::new(GameConfig {
        kinds: 26,
        min_match_count: 10,
        ..config_6x6()
    })
    .unwrap();
    for _ in 0..10 {
        session.update(FRAME, &FrameInput::press(Intent::HardDrop));
        session.resolve_now();
        if session.is_game_over() {
            break;
        }
    }
    assert!(session.is_game_over());
    assert!(
        session
            .drain_events()
            .iter()
            .any(|e| matches!(e, GameEvent::GameOver { .. }))
    );
}

#[test]
fn test_same_seed_same_game() {
    let script = [
        Intent::MoveLeft,
        Intent::RotateCw,
        Intent::HardDrop,
        Intent::MoveRight,
        Intent::MoveRight,
        Intent::HardDrop,
        Intent::RotateCcw,
        Intent::HardDrop,
    ];
    let play = || {
        let mut session = GameSession::new(config_6x6()).unwrap();
        for &intent in &script {
            session.update(FRAME, &FrameInput::press(intent));
            session.resolve_now();
        }
        (session.grid().clone(), session.score(), session.drain_events())
    };
    assert_eq!(play(), play());
}

#[test]
fn test_tetromino_rigid_lock() {
    let config = GameConfig {
        seed: Some(5),
        ..GameConfig::preset(Variant::Tetrominoes)
    };
    let mut session = GameSession::new(config).unwrap();
    let shape = session.piece().unwrap().shape;
    assert!(matches!(shape, PieceShape::Tetromino(_)));
    session.update(FRAME, &FrameInput::press(Intent::HardDrop));
    let events = session.drain_events();
    assert!(matches!(
        events.first(),
        Some(GameEvent::Lock { cells, complete: true }) if cells.len() == 4
    ));
    assert_eq!(session.grid().occupied_count(), 4);
    let rows = session.grid().to_rows();
    assert!(rows[rows.len() - 1].contains(|c: char| c != '.'));
}

#[test]
fn test_independent_split_loses_control() {
    // Pivot lands on the ledge; the partner keeps falling alone.
    let grid = Grid::from_rows(&[
        "......", "......", "......", "......", "..A...", "..A...",
    ]);
    let mut session = GameSession::with_grid(config_6x6(), grid).unwrap();
    session.update(FRAME, &FrameInput::none());
    assert_eq!(session.phase(), Phase::Falling);
    // Lay the pair flat: pivot at x=2, partner at x=3.
    session.update(FRAME, &FrameInput::press(Intent::RotateCw));
    let positions = session.piece().unwrap().positions();
    assert_eq!(positions, vec![(2, 1), (3, 1)]);

    session.update(Duration::from_secs(2), &FrameInput::none());
    let piece = session.piece().expect("partner still falling");
    assert!(piece.is_detached());
    assert_eq!(piece.positions().len(), 1);
    // Player input is ignored once detached.
    let before = piece.positions();
    session.update(Duration::ZERO, &FrameInput::press(Intent::MoveLeft));
    assert_eq!(session.piece().unwrap().positions(), before);
}

#[test]
fn test_config_json_to_session() {
    let json = r#"{
        "rows": 8, "cols": 5, "minMatchCount": 3,
        "gravitySpeed": 2.0, "fallAcceleration": 0.0,
        "resolutionFallSpeed": 30.0, "scorePerUnit": 7,
        "chainBonusMultiplier": 0.5, "seed": 11
    }"#;
    let config = GameConfig::from_json(json).unwrap();
    let session = GameSession::new(config).unwrap();
    assert_eq!(session.grid().rows(), 8);
    assert_eq!(session.grid().cols(), 5);
    assert_eq!(session.config().score_per_unit, 7);
    assert_eq!(session.phase(), Phase::Falling);
}

#[test]
fn test_swap_session_starts_without_matches() {
    let config = GameConfig {
        seed: Some(21),
        ..GameConfig::preset(Variant::Swap)
    };
    let session = GameSession::new(config).unwrap();
    assert_eq!(session.phase(), Phase::Idle);
    assert!(session.piece().is_none());
    assert_eq!(session.grid().occupied_count(), 64);
    let snap = session.snapshot();
    assert!(snap.clearing.is_empty());
    assert_eq!(snap.variant, Variant::Swap);
}

#[test]
fn test_spawn_tetromino_offsets_fit_preset() {
    let config = GameConfig::preset(Variant::Tetrominoes);
    let (sx, sy) = config.spawn_position();
    let grid = Grid::new(config.rows, config.cols);
    for t in TetrominoKind::ALL {
        let mut pc = PieceController::new(LockPolicy::Rigid, Duration::ZERO);
        let shape = PieceShape::Tetromino(t);
        assert!(pc.try_spawn(&grid, shape, &[Kind(0); 4], (sx, sy)), "{t:?}");
    }
}

#[test]
fn test_matched_cells_visible_for_one_frame() {
    let grid = Grid::from_rows(&["......", "......", "A.....", "BBB...", "ADC...", "ACD..."]);
    let mut session = GameSession::with_grid(config_6x6(), grid).unwrap();
    session.begin_resolution();

    let mut highlighted = Vec::new();
    for _ in 0..200 {
        session.update(FRAME, &FrameInput::none());
        let clearing = session.snapshot().clearing;
        if !clearing.is_empty() {
            assert_eq!(session.phase(), Phase::ClearAndCascade);
            // Still in the grid while highlighted.
            for &(x, y) in &clearing {
                assert!(session.grid().kind_at(x, y).is_some());
            }
            highlighted.push(clearing);
        }
        if session.phase() == Phase::Falling {
            break;
        }
    }

    let mut cleared: Vec<Vec<(usize, usize)>> = session
        .drain_events()
        .into_iter()
        .filter_map(|e| match e {
            GameEvent::Match { cells, .. } => Some(cells),
            _ => None,
        })
        .collect();
    for cells in cleared.iter_mut().chain(highlighted.iter_mut()) {
        cells.sort_unstable();
    }
    assert_eq!(highlighted.len(), 2);
    assert_eq!(highlighted, cleared);
    assert_eq!(session.score(), 90);
}

#[test]
fn test_tetromino_full_row_is_not_a_clear() {
    let config = GameConfig {
        seed: Some(3),
        ..GameConfig::preset(Variant::Tetrominoes)
    };
    let mut grid = Grid::new(config.rows, config.cols);
    let bottom = config.rows - 1;
    for x in 0..config.cols {
        grid.set(x, bottom, Kind((x % 4) as u8));
    }
    let before = grid.clone();
    let mut session = GameSession::with_grid(config, grid).unwrap();
    session.begin_resolution();
    session.resolve_now();

    assert_eq!(session.grid(), &before);
    assert_eq!(session.score(), 0);
    assert!(matches(&session.drain_events()).is_empty());
}
