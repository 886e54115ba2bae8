use clap::Args;
use hunt_property::calculators::{emi, EmiRequest};
use hunt_property::error::AppError;
use hunt_property::marketplace::{
    Furnishing, GeoPoint, InMemoryStore, Location, MarketplaceService, NewProperty, NewUser,
    Property, PropertySearchParams, TransactionType, UserType,
};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Free-text query run against the seeded listings.
    #[arg(long, default_value = "sea view")]
    pub(crate) text: String,
    /// Longitude of the radius search centre.
    #[arg(long, default_value_t = 80.2707)]
    pub(crate) longitude: f64,
    /// Latitude of the radius search centre.
    #[arg(long, default_value_t = 13.0827)]
    pub(crate) latitude: f64,
    /// Radius in metres.
    #[arg(long, default_value_t = 5000.0)]
    pub(crate) max_distance: f64,
}

struct SeedListing {
    title: &'static str,
    description: &'static str,
    transaction_type: TransactionType,
    price: f64,
    bedrooms: u32,
    locality: &'static str,
    city: &'static str,
    coordinates: (f64, f64),
}

const SEED_LISTINGS: [SeedListing; 5] = [
    SeedListing {
        title: "Sea view apartment in Besant Nagar",
        description: "Three bedroom flat steps from Elliot's beach",
        transaction_type: TransactionType::Sale,
        price: 14_500_000.0,
        bedrooms: 3,
        locality: "Besant Nagar",
        city: "Chennai",
        coordinates: (80.2668, 13.0002),
    },
    SeedListing {
        title: "Compact studio near Central",
        description: "Walk to the railway station and the metro",
        transaction_type: TransactionType::Rent,
        price: 12_000.0,
        bedrooms: 1,
        locality: "Park Town",
        city: "Chennai",
        coordinates: (80.2750, 13.0850),
    },
    SeedListing {
        title: "Family home in Kilpauk",
        description: "Independent house with a garden and covered parking",
        transaction_type: TransactionType::Sale,
        price: 21_000_000.0,
        bedrooms: 4,
        locality: "Kilpauk",
        city: "Chennai",
        coordinates: (80.2500, 13.0500),
    },
    SeedListing {
        title: "Egmore 2BHK for rent",
        description: "Semi furnished flat with a partial sea view from the terrace",
        transaction_type: TransactionType::Rent,
        price: 28_000.0,
        bedrooms: 2,
        locality: "Egmore",
        city: "Chennai",
        coordinates: (80.2610, 13.0732),
    },
    SeedListing {
        title: "Kothrud villa",
        description: "Hillside villa with city views",
        transaction_type: TransactionType::Sale,
        price: 32_000_000.0,
        bedrooms: 5,
        locality: "Kothrud",
        city: "Pune",
        coordinates: (73.8077, 18.5074),
    },
];

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let service = MarketplaceService::new(Arc::new(InMemoryStore::new()));

    let owner = service
        .register_user(NewUser {
            name: "Demo Owner".to_string(),
            email: "owner@demo.huntproperty.in".to_string(),
            phone: "+919800000000".to_string(),
            user_type: UserType::Owner,
            password: "demo-password".to_string(),
        })
        .await?;

    for seed in &SEED_LISTINGS {
        service
            .create_property(seed_payload(owner.id.to_string(), seed))
            .await?;
    }
    println!(
        "Seeded {} listings for {} <{}>",
        SEED_LISTINGS.len(),
        owner.name,
        owner.email
    );

    println!();
    println!("Text search: \"{}\"", args.text);
    let by_text = service
        .search_properties(PropertySearchParams {
            text: Some(args.text.clone()),
            ..PropertySearchParams::default()
        })
        .await?;
    render_listings(&by_text, None);

    println!();
    println!(
        "Within {:.0} m of ({:.4}, {:.4}), nearest first",
        args.max_distance, args.longitude, args.latitude
    );
    let centre = GeoPoint::new(args.longitude, args.latitude);
    let nearby = service
        .search_properties(PropertySearchParams {
            longitude: Some(args.longitude),
            latitude: Some(args.latitude),
            max_distance: Some(args.max_distance),
            ..PropertySearchParams::default()
        })
        .await?;
    render_listings(&nearby, Some(&centre));

    let options = service.filter_screen(Default::default()).await?;
    println!();
    println!("Filter screen");
    println!("  Cities: {}", options.cities.join(", "));
    println!(
        "  Price range: {:.0} - {:.0}",
        options.price_range.min, options.price_range.max
    );
    println!(
        "  Bedrooms: {}",
        options
            .bedrooms
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );

    if let Some(cheapest_sale) = nearby
        .iter()
        .filter(|property| property.transaction_type == TransactionType::Sale)
        .min_by(|a, b| a.price.total_cmp(&b.price))
    {
        let loan_amount = (cheapest_sale.price * 0.8).round();
        match emi(EmiRequest {
            loan_amount,
            loan_tenure_years: 20.0,
            rate_of_interest: 8.5,
        }) {
            Ok(breakdown) => {
                println!();
                println!(
                    "EMI for an 80% loan on \"{}\": {:.0}/month over 20 years at 8.5%",
                    cheapest_sale.title, breakdown.monthly_emi
                );
            }
            Err(err) => println!("EMI unavailable: {err}"),
        }
    }

    Ok(())
}

fn seed_payload(owner_id: String, seed: &SeedListing) -> NewProperty {
    let (longitude, latitude) = seed.coordinates;
    NewProperty {
        owner_id,
        title: seed.title.to_string(),
        description: seed.description.to_string(),
        transaction_type: seed.transaction_type,
        price: seed.price,
        property_category: Some("Residential".to_string()),
        property_subtype: None,
        bedrooms: seed.bedrooms,
        bathrooms: seed.bedrooms.max(1),
        balconies: None,
        area_sqft: 450.0 * f64::from(seed.bedrooms),
        furnishing: Furnishing::SemiFurnished,
        floor_number: None,
        total_floors: None,
        floors_allowed: None,
        open_sides: None,
        facing: None,
        store_room: None,
        servant_room: None,
        location: Location {
            address: format!("{}, {}", seed.locality, seed.city),
            locality: seed.locality.to_string(),
            city: seed.city.to_string(),
            geo: GeoPoint::new(longitude, latitude),
        },
        images: Vec::new(),
        amenities: Vec::new(),
    }
}

fn render_listings(listings: &[Property], centre: Option<&GeoPoint>) {
    if listings.is_empty() {
        println!("  (no matches)");
        return;
    }
    for property in listings {
        let distance = centre
            .map(|centre| format!(" [{:.0} m]", centre.distance_to(&property.location.geo)))
            .unwrap_or_default();
        println!(
            "  - {} | {} | {:.0} | {}, {}{}",
            property.title,
            property.transaction_type.label(),
            property.price,
            property.location.locality,
            property.location.city,
            distance
        );
    }
}
