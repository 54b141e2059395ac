use core::ops::RangeInclusive;

use types::Level;

/// Splits an inclusive range into contiguous sub-ranges of at most
/// `page_size` levels, in order. An empty range yields no pages.
pub fn partition_ranges(
    page_size: usize,
    range: RangeInclusive<Level>,
) -> impl Iterator<Item = RangeInclusive<Level>> {
    let page_size = page_size.max(1);
    let (start, end) = range.into_inner();

    (start..=end).step_by(page_size).map(move |page_start| {
        let page_end = end.min(page_start + page_size as Level - 1);
        page_start..=page_end
    })
}

/// Batches a list by partitioning its index range and slicing, the way
/// account-id lists are paged. An empty list yields no batches.
pub fn partition_list<T>(page_size: usize, items: &[T]) -> impl Iterator<Item = &[T]> + '_ {
    let last_index = items.len() as Level - 1;

    partition_ranges(page_size, 0..=last_index).map(move |indices| {
        let (start, end) = indices.into_inner();
        &items[start as usize..=end as usize]
    })
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(2, 101..=103, vec![101..=102, 103..=103]; "odd tail keeps a short page")]
    #[test_case(3, 1..=3, vec![1..=3]; "exact fit is a single page")]
    #[test_case(10, 5..=7, vec![5..=7]; "oversized page covers everything")]
    #[test_case(1, 1..=3, vec![1..=1, 2..=2, 3..=3]; "unit pages")]
    #[test_case(4, 10..=9, vec![]; "empty range yields no pages")]
    fn partitions_cover_the_range_in_order(
        page_size: usize,
        range: RangeInclusive<Level>,
        expected: Vec<RangeInclusive<Level>>,
    ) {
        assert_eq!(
            partition_ranges(page_size, range).collect::<Vec<_>>(),
            expected,
        );
    }

    #[test]
    fn concatenated_pages_reproduce_the_range() {
        let range = 0..=1000;

        let levels = partition_ranges(7, range.clone())
            .flatten()
            .collect::<Vec<_>>();

        assert_eq!(levels, range.collect::<Vec<_>>());
    }

    #[test]
    fn no_page_exceeds_the_page_size() {
        assert!(partition_ranges(7, 0..=1000).all(|page| {
            let (start, end) = page.into_inner();
            end - start + 1 <= 7
        }));
    }

    #[test]
    fn lists_batch_by_index_in_order() {
        let ids = ["a", "b", "c", "d", "e"];

        let batches = partition_list(2, &ids).collect::<Vec<_>>();

        assert_eq!(
            batches,
            vec![&["a", "b"][..], &["c", "d"][..], &["e"][..]],
        );
    }

    #[test]
    fn concatenated_batches_reproduce_the_list() {
        let ids = (0..23).collect::<Vec<_>>();

        let flattened = partition_list(7, &ids)
            .flatten()
            .copied()
            .collect::<Vec<_>>();

        assert_eq!(flattened, ids);
    }

    #[test]
    fn empty_list_yields_no_batches() {
        assert_eq!(partition_list::<Level>(3, &[]).count(), 0);
    }
}
