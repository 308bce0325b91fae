//! Replaces the source's module-scoped dimension lists with a value
//! constructed once by the driver and passed explicitly to every component.

use crate::reference::{
    CalendarDay, Crop, Customer, Facility, FacilityLine, HarvestForecastEntry, Product,
    ProductId, RouteConstraint,
};
use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Context {
    pub forecast_date: NaiveDate,
    pub run_id: String,
    facilities: HashMap<i32, Facility>,
    facility_lines: Vec<FacilityLine>,
    crops: HashMap<i32, Crop>,
    products: HashMap<ProductId, Product>,
    customers: HashMap<i32, Customer>,
    routes: Vec<RouteConstraint>,
    harvest_forecast: Vec<HarvestForecastEntry>,
    calendar: HashMap<NaiveDate, CalendarDay>,
}

impl Context {
    pub fn new(
        forecast_date: NaiveDate,
        run_id: String,
        facilities: Vec<Facility>,
        facility_lines: Vec<FacilityLine>,
        crops: Vec<Crop>,
        products: Vec<Product>,
        customers: Vec<Customer>,
        routes: Vec<RouteConstraint>,
        harvest_forecast: Vec<HarvestForecastEntry>,
        calendar: Vec<CalendarDay>,
    ) -> Self {
        Self {
            forecast_date,
            run_id,
            facilities: facilities.into_iter().map(|f| (f.id, f)).collect(),
            facility_lines,
            crops: crops.into_iter().map(|c| (c.id, c)).collect(),
            products: products.into_iter().map(|p| (p.id, p)).collect(),
            customers: customers.into_iter().map(|c| (c.id, c)).collect(),
            routes,
            harvest_forecast,
            calendar: calendar.into_iter().map(|d| (d.date, d)).collect(),
        }
    }

    pub fn facility(&self, id: i32) -> Option<&Facility> {
        self.facilities.get(&id)
    }

    pub fn facilities(&self) -> impl Iterator<Item = &Facility> {
        self.facilities.values()
    }

    pub fn facility_lines(&self) -> &[FacilityLine] {
        &self.facility_lines
    }

    pub fn crop(&self, id: i32) -> Option<&Crop> {
        self.crops.get(&id)
    }

    pub fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.get(&id)
    }

    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    pub fn customer(&self, id: i32) -> Option<&Customer> {
        self.customers.get(&id)
    }

    pub fn customers(&self) -> impl Iterator<Item = &Customer> {
        self.customers.values()
    }

    pub fn routes(&self) -> &[RouteConstraint] {
        &self.routes
    }

    pub fn harvest_forecast(&self) -> &[HarvestForecastEntry] {
        &self.harvest_forecast
    }

    pub fn harvest_forecast_for(&self, date: NaiveDate, crop_id: i32, region: i32) -> Vec<&HarvestForecastEntry> {
        self.harvest_forecast
            .iter()
            .filter(|e| {
                e.date == date
                    && e.crop_id == crop_id
                    && crate::reference::canonical_facility(e.facility_id) == region
            })
            .collect()
    }

    pub fn calendar_day(&self, date: NaiveDate) -> Option<&CalendarDay> {
        self.calendar.get(&date)
    }
}
