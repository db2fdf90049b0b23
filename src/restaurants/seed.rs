use rand::Rng;

use crate::restaurants::converter::DocumentConverter;
use crate::restaurants::error::RestaurantsResult;
use crate::restaurants::model::Restaurant;
use crate::store::{CollectionReference, DocumentReference};

const WORDS: [&str; 9] = [
    "Bar", "Fire", "Grill", "Drive Thru", "Place", "Best", "Spot", "Prime", "Eatin'",
];

const CITIES: [&str; 10] = [
    "San Francisco",
    "Mountain View",
    "Palo Alto",
    "Redwood City",
    "San Mateo",
    "Cupertino",
    "San Jose",
    "Daly City",
    "Millbrae",
    "Belmont",
];

const CATEGORIES: [&str; 7] = [
    "Pizza", "Burgers", "American", "Dim Sum", "Pho", "Mexican", "Hot Pot",
];

const IMAGE_COUNT: u32 = 22;

/// A new, unrated restaurant with a random name, city, category and price.
pub fn random_restaurant<R>(rng: &mut R) -> Restaurant
where
    R: Rng + ?Sized,
{
    let first = WORDS[rng.gen_range(0..WORDS.len())];
    let second = WORDS[rng.gen_range(0..WORDS.len())];
    Restaurant {
        name: format!("{first} {second}"),
        category: CATEGORIES[rng.gen_range(0..CATEGORIES.len())].to_string(),
        city: CITIES[rng.gen_range(0..CITIES.len())].to_string(),
        price: rng.gen_range(1..=3),
        rating_count: 0,
        average_rating: 0.0,
    }
}

/// Writes `count` random restaurants into `collection`.
pub fn populate<C, R>(
    collection: &CollectionReference,
    converter: &C,
    rng: &mut R,
    count: usize,
) -> RestaurantsResult<Vec<DocumentReference>>
where
    C: DocumentConverter<Model = Restaurant>,
    R: Rng + ?Sized,
{
    (0..count)
        .map(|_| -> RestaurantsResult<DocumentReference> {
            let data = converter.to_map(&random_restaurant(rng))?;
            Ok(collection.add_document(data)?)
        })
        .collect()
}

/// One of the stock food photos used as a restaurant thumbnail.
pub fn random_image_url<R>(rng: &mut R) -> String
where
    R: Rng + ?Sized,
{
    let number = rng.gen_range(1..=IMAGE_COUNT);
    format!("https://storage.googleapis.com/firestorequickstarts.appspot.com/food_{number}.png")
}
