use book_core::perft::perft_root;

const REFERENCE_COUNTS: &[(u32, u64)] = &[
    (1, 4),
    (2, 12),
    (3, 56),
    (4, 244),
    (5, 1_396),
    (6, 8_200),
    (7, 55_092),
    (8, 390_216),
];

#[test]
fn test_perft() {
    for &(depth, nodes) in REFERENCE_COUNTS {
        assert_eq!(perft_root(depth), nodes, "perft depth {depth}");
    }
}
