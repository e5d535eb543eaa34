/// Shuffle-split `labels` into `(train, test)` index sets, keeping each
/// class's share of the test set at `test_fraction` (rounded).
///
/// Both index lists are returned sorted.
pub fn stratified_split(
    labels: &[bool],
    test_fraction: f64,
    rng: &mut fastrand::Rng,
) -> (Vec<usize>, Vec<usize>) {
    let fraction = test_fraction.clamp(0.0, 1.0);
    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();

    for class in [false, true] {
        let mut members: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|&(_, &l)| l == class)
            .map(|(i, _)| i)
            .collect();
        rng.shuffle(&mut members);
        let n_test = (members.len() as f64 * fraction).round() as usize;
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_class_ratio() {
        let labels: Vec<bool> = (0..100).map(|i| i % 10 == 0).collect();
        let mut rng = fastrand::Rng::with_seed(42);
        let (train, test) = stratified_split(&labels, 0.2, &mut rng);

        assert_eq!(train.len(), 80);
        assert_eq!(test.len(), 20);
        assert_eq!(test.iter().filter(|&&i| labels[i]).count(), 2);
        assert_eq!(train.iter().filter(|&&i| labels[i]).count(), 8);
    }

    #[test]
    fn partitions_every_index_once() {
        let labels: Vec<bool> = (0..37).map(|i| i % 3 == 0).collect();
        let mut rng = fastrand::Rng::with_seed(5);
        let (train, test) = stratified_split(&labels, 0.25, &mut rng);

        let mut all: Vec<usize> = train.iter().chain(&test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..37).collect::<Vec<_>>());
    }

    #[test]
    fn deterministic_for_a_seed() {
        let labels: Vec<bool> = (0..50).map(|i| i % 4 == 0).collect();
        let a = stratified_split(&labels, 0.2, &mut fastrand::Rng::with_seed(9));
        let b = stratified_split(&labels, 0.2, &mut fastrand::Rng::with_seed(9));
        assert_eq!(a, b);
    }
}
