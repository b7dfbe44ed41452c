mod util;

use std::collections::BTreeSet;

use coupling_emulator::data::Mesh;
use coupling_emulator::topology::edges::{edge_occurrences, quad_sides, triangle_sides};
use coupling_emulator::topology::{UndirectedEdge, unique_edges};
use proptest::prelude::*;
use util::fixture_mesh;

fn canonical_set(mesh: &Mesh) -> BTreeSet<(usize, usize)> {
    let mut set = BTreeSet::new();
    for &[a, b] in &mesh.edges {
        set.insert((a.min(b), a.max(b)));
    }
    for &t in &mesh.triangles {
        set.extend(triangle_sides(t).map(|e| (e.first(), e.second())));
    }
    for &q in &mesh.quads {
        set.extend(quad_sides(q).map(|e| (e.first(), e.second())));
    }
    set
}

fn mesh_strategy() -> impl Strategy<Value = Mesh> {
    (2usize..16).prop_flat_map(|n| {
        (
            Just(n),
            prop::collection::vec(prop::array::uniform2(0..n), 0..8),
            prop::collection::vec(prop::array::uniform3(0..n), 0..8),
            prop::collection::vec(prop::array::uniform4(0..n), 0..8),
        )
            .prop_map(|(n, edges, triangles, quads)| Mesh {
                positions: vec![vec![0.0; 3]; n],
                edges,
                triangles,
                quads,
                ..Default::default()
            })
    })
}

#[test]
fn fixture_has_22_occurrences_and_16_unique_edges() {
    let mesh = fixture_mesh();
    assert_eq!(edge_occurrences(&mesh), 22);
    let edges = unique_edges(&mesh);
    assert_eq!(edges.len(), 16);
    assert!(edges.contains(&UndirectedEdge::new(9, 10)));
    assert!(edges.contains(&UndirectedEdge::new(3, 6)));
    assert_eq!(edges.first(), Some(&UndirectedEdge::new(0, 1)));
    assert_eq!(edges.last(), Some(&UndirectedEdge::new(10, 11)));
}

#[test]
fn result_does_not_depend_on_face_order() {
    let mesh = fixture_mesh();
    let mut shuffled = mesh.clone();
    shuffled.triangles.reverse();
    shuffled.quads.reverse();
    shuffled.edges = vec![[11, 10], [10, 9]];
    assert_eq!(unique_edges(&mesh), unique_edges(&shuffled));
}

proptest! {
    #[test]
    fn unique_edges_are_strictly_ascending(mesh in mesh_strategy()) {
        let edges = unique_edges(&mesh);
        prop_assert!(edges.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(edges.iter().all(|e| e.first() <= e.second()));
    }

    #[test]
    fn unique_edges_match_the_set_of_sides(mesh in mesh_strategy()) {
        let edges: Vec<(usize, usize)> = unique_edges(&mesh)
            .iter()
            .map(|e| (e.first(), e.second()))
            .collect();
        let expected: Vec<(usize, usize)> = canonical_set(&mesh).into_iter().collect();
        prop_assert_eq!(edges, expected);
    }

    #[test]
    fn unique_edges_is_idempotent(mesh in mesh_strategy()) {
        let once = unique_edges(&mesh);
        let as_edges = Mesh {
            positions: mesh.positions.clone(),
            edges: once.iter().map(|e| e.vertices()).collect(),
            ..Default::default()
        };
        prop_assert_eq!(unique_edges(&as_edges), once);
    }
}
