//! Tests for `SpotSet` membership and set operations

#[cfg(test)]
mod tests {
    use stniche::algorithm::bitset::SpotSet;

    // Verifies a new set is empty with count 0
    #[test]
    fn test_new_set_is_empty() {
        let set = SpotSet::new(10);
        assert_eq!(set.count(), 0);
        assert!(set.is_empty());
    }

    #[test]
    fn test_insert_and_contains() {
        let mut set = SpotSet::new(10);
        set.insert(5);
        set.insert(5);
        assert!(set.contains(5));
        assert!(!set.contains(3));
        assert_eq!(set.count(), 1);
    }

    // Out-of-range nodes are ignored rather than growing the set
    #[test]
    fn test_out_of_range_ignored() {
        let mut set = SpotSet::new(4);
        set.insert(9);
        assert!(set.is_empty());
        assert!(!set.contains(9));
    }

    #[test]
    fn test_extend_with_instances() {
        let mut set = SpotSet::new(8);
        set.extend(&[0, 1, 3]);
        set.extend(&[1, 2, 3]);
        assert_eq!(set.to_vec(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_union_and_difference() {
        let mut left = SpotSet::new(6);
        left.extend(&[0, 2]);
        let mut right = SpotSet::new(6);
        right.extend(&[2, 5]);

        left.union_with(&right);
        assert_eq!(left.to_vec(), vec![0, 2, 5]);

        let background = SpotSet::all(6).difference(&left);
        assert_eq!(background.to_vec(), vec![1, 3, 4]);
    }

    #[test]
    fn test_display() {
        let mut set = SpotSet::new(4);
        set.extend(&[1, 3]);
        assert_eq!(set.to_string(), "SpotSet(2 spots: [1, 3])");
    }
}
