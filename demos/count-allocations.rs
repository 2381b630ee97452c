use rand::Rng;

use allocated::{CountingAllocator, DropIn};

use allocated_rbtree::{AllocatedRbTreeMap, Error, Natural};

fn main() -> Result<(), Error> {
    for i in 0..100 {
        let alloc = CountingAllocator::default();
        let mut map = AllocatedRbTreeMap::<u32, u32>::new_in(&alloc, Natural)?.into_inner();

        let mut rng = rand::thread_rng();

        for _ in 0..1000 {
            let k: u32 = rng.gen();
            let v: u32 = rng.gen();

            unsafe {
                map.insert_in(&alloc, k, v)?;
            }

            // Remove the first key at or after a random probe now and then.
            if rng.gen_ratio(1, 4) {
                let probe: u32 = rng.gen();
                let pos = map.lower_bound(&probe);
                map.erase(pos);
            }

            println!(
                "{},{},{},{},{}",
                i,
                map.len(),
                map.capacity(),
                alloc.n_allocations(),
                alloc.n_bytes_allocated()
            );
        }

        unsafe {
            map.drop_in(&alloc);
        }

        assert_eq!(alloc.net_allocations(), 0);
        assert_eq!(alloc.net_bytes_allocated(), 0);
    }

    Ok(())
}
