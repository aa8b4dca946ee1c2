//! Synthetic user dataset generator.
//!
//! Produces the fixed 100-user roster the assistant is demoed with:
//! balanced dietary preferences (about a third each), 0-3 weighted medical
//! conditions per user, and occasional physical limitations.

use rand::prelude::*;
use tracing::info;

use crate::error::NovaError;
use crate::store::HealthStore;
use crate::types::{DietaryPreference, User};

const FIRST_NAMES: &[&str] = &[
    "Asha", "Rohan", "Priya", "Arjun", "Meera", "Kiran", "Divya", "Nikhil", "Sneha", "Vikram",
    "Anita", "Rahul", "Kavya", "Sanjay", "Leela", "Maria", "James", "Sofia", "Daniel", "Emma",
    "Lucas", "Olivia", "Noah", "Mia", "Ethan",
];

const LAST_NAMES: &[&str] = &[
    "Sharma", "Iyer", "Patel", "Reddy", "Nair", "Kulkarni", "Mehta", "Rao", "Desai", "Singh",
    "Gupta", "Joshi", "Silva", "Garcia", "Smith", "Johnson", "Brown", "Martinez", "Lee", "Novak",
];

const CITIES: &[&str] = &[
    "Mumbai", "Delhi", "Hyderabad", "Bengaluru", "Chennai", "Kolkata", "Pune", "Ahmedabad",
    "London", "Lisbon", "Toronto", "Singapore", "Nairobi", "Austin", "Oslo", "Barcelona",
];

const CONDITIONS_POOL: &[&str] = &[
    "Type 2 Diabetes",
    "Hypertension",
    "High Cholesterol",
    "Hypothyroidism",
    "PCOS",
    "Asthma",
    "Arthritis",
    "Depression",
];

const LIMITATIONS_POOL: &[&str] = &[
    "mobility issues",
    "swallowing difficulties",
    "vision problems",
    "hearing impairment",
];

/// Generate `count` users with ids 1..=count.
pub fn generate_users(count: i64, rng: &mut impl Rng) -> Vec<User> {
    let mut users = Vec::with_capacity(count as usize);
    for id in 1..=count {
        // Balanced diets: first third vegetarian, second non-veg, rest vegan.
        let dietary_preference = if id * 3 <= count {
            DietaryPreference::Vegetarian
        } else if id * 3 <= count * 2 {
            DietaryPreference::NonVegetarian
        } else {
            DietaryPreference::Vegan
        };

        // 0-3 conditions, weighted [0.3, 0.4, 0.2, 0.1].
        let roll: f64 = rng.gen();
        let num_conditions: usize = if roll < 0.3 {
            0
        } else if roll < 0.7 {
            1
        } else if roll < 0.9 {
            2
        } else {
            3
        };
        let medical_conditions: Vec<String> = CONDITIONS_POOL
            .choose_multiple(rng, num_conditions)
            .map(|s| s.to_string())
            .collect();

        // Most users have no physical limitations.
        let physical_limitations = if rng.gen_bool(0.1) {
            vec![LIMITATIONS_POOL.choose(rng).unwrap().to_string()]
        } else {
            vec![]
        };

        users.push(User {
            id,
            first_name: FIRST_NAMES.choose(rng).unwrap().to_string(),
            last_name: LAST_NAMES.choose(rng).unwrap().to_string(),
            city: CITIES.choose(rng).unwrap().to_string(),
            dietary_preference,
            medical_conditions,
            physical_limitations,
        });
    }
    users
}

/// Populate a store with the standard 100-user roster if it is empty.
pub fn seed_store(store: &dyn HealthStore) -> Result<i64, NovaError> {
    if store.user_count()? > 0 {
        return Ok(0);
    }
    let mut rng = rand::thread_rng();
    let users = generate_users(100, &mut rng);
    for user in &users {
        store.insert_user(user)?;
    }
    info!(count = users.len(), "seeded synthetic user roster");
    Ok(users.len() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn generates_requested_count_with_sequential_ids() {
        let mut rng = StdRng::seed_from_u64(7);
        let users = generate_users(100, &mut rng);
        assert_eq!(users.len(), 100);
        assert_eq!(users.first().unwrap().id, 1);
        assert_eq!(users.last().unwrap().id, 100);
    }

    #[test]
    fn diets_are_balanced_in_thirds() {
        let mut rng = StdRng::seed_from_u64(7);
        let users = generate_users(99, &mut rng);
        let veg = users
            .iter()
            .filter(|u| u.dietary_preference == DietaryPreference::Vegetarian)
            .count();
        let nonveg = users
            .iter()
            .filter(|u| u.dietary_preference == DietaryPreference::NonVegetarian)
            .count();
        let vegan = users
            .iter()
            .filter(|u| u.dietary_preference == DietaryPreference::Vegan)
            .count();
        assert_eq!((veg, nonveg, vegan), (33, 33, 33));
    }

    #[test]
    fn conditions_come_from_the_fixed_pool() {
        let mut rng = StdRng::seed_from_u64(42);
        for user in generate_users(50, &mut rng) {
            assert!(user.medical_conditions.len() <= 3);
            for condition in &user.medical_conditions {
                assert!(CONDITIONS_POOL.contains(&condition.as_str()));
            }
        }
    }

    #[test]
    fn seeding_is_idempotent() {
        let store = crate::store::MemoryStore::new();
        assert_eq!(seed_store(&store).unwrap(), 100);
        assert_eq!(seed_store(&store).unwrap(), 0);
        assert_eq!(store.user_count().unwrap(), 100);
    }
}
